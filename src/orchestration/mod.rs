//! # Orchestration
//!
//! The demo scenario on top of the execution model: two uppercase tasks, an
//! operation that always fails, and a resource fetch whose length is measured.
//!
//! ## Core Components
//!
//! - **Orchestrator**: issues operations and composes them; one entry point per trigger
//! - **Trigger**: the external events the orchestrator responds to
//! - **ResourceFetcher**: seam for the opaque "fetch a resource" operation
//! - **Narrative**: the progress text one trigger invocation renders back

pub mod narrative;
pub mod orchestrator;
pub mod resource;
pub mod trigger;

pub use narrative::Narrative;
pub use orchestrator::{FiredTrigger, Orchestrator};
pub use resource::{FailingFetcher, ResourceFetcher, SimulatedFetcher};
pub use trigger::Trigger;
