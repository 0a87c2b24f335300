//! Asynchronous operations and their composition.

pub mod composite;
pub mod handle;

pub use composite::CompositeWait;
pub use handle::{AsyncOperation, Awaiting, Outcome, ResumeOn};
