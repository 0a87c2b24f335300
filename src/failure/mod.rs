//! Failure capture and reporting for asynchronous operations.

pub mod operation_failure;
pub mod reporter;

pub use operation_failure::OperationFailure;
pub use reporter::{FailureChannel, FailureReport, FailureReporter};
