#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Async Orchestration Demo
//!
//! A small, faithful model of asynchronous task orchestration: issuing
//! long-running operations, composing them, and reasoning about blocking versus
//! non-blocking completion.
//!
//! ## Overview
//!
//! Work runs on a worker pool; one dedicated thread plays the foreground lane
//! (the UI thread of a desktop app). Operations are eager, their outcome is
//! captured once and replayed to every observer, and continuations name the lane
//! they resume on. Blocking the foreground on an operation whose continuation
//! needs the foreground deadlocks for real, and the crate keeps that scenario
//! reproducible instead of hiding it.
//!
//! ## Module Organization
//!
//! - [`operation`] - operation handles, continuations and the join-all combinator
//! - [`execution`] - the foreground lane and the worker pool
//! - [`failure`] - failure capture and the observed/unobserved reporter
//! - [`state_machine`] - operation lifecycle transitions
//! - [`orchestration`] - the demo scenario and its trigger entry points
//! - [`config`] - layered configuration
//! - [`logging`] - structured logging setup
//! - [`error`] - crate error type
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use async_orchestration::config::DemoConfig;
//! use async_orchestration::orchestration::{Orchestrator, Trigger};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let orchestrator = Orchestrator::new(DemoConfig::default())?;
//! let rendered = orchestrator.fire(Trigger::JoinAll)?.recv()?;
//! println!("{rendered}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit and integration tests
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod execution;
pub mod failure;
pub mod logging;
pub mod operation;
pub mod orchestration;
pub mod state_machine;

pub use config::{ConfigManager, DemoConfig};
pub use error::{OrchestrationError, Result};
pub use execution::{ForegroundContext, WorkerPool};
pub use failure::{FailureReporter, OperationFailure};
pub use operation::{AsyncOperation, CompositeWait, Outcome, ResumeOn};
pub use orchestration::{FiredTrigger, Narrative, Orchestrator, Trigger};
pub use state_machine::OperationStatus;
