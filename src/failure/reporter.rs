//! # Failure Reporter
//!
//! Collects failures raised inside asynchronous operations and makes the
//! channel they arrived on explicit:
//!
//! - **Observed**: the failure was rethrown at an await, blocking wait or
//!   result read, and the trigger surfaced it as a user-visible message.
//! - **Unobserved**: the operation failed and every handle to it was dropped
//!   (or detached) without anyone reading its outcome. These are logged and kept
//!   for inspection; nothing recovers or retries them.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

use super::OperationFailure;

/// How a failure reached the reporter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureChannel {
    Observed,
    Unobserved,
}

/// A single recorded failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureReport {
    pub operation: String,
    pub channel: FailureChannel,
    pub message: String,
    /// Set for unobserved failures of operations that were explicitly detached
    pub detached: bool,
    pub reported_at: DateTime<Utc>,
}

/// Shared sink for operation failures
#[derive(Debug, Clone, Default)]
pub struct FailureReporter {
    reports: Arc<Mutex<Vec<FailureReport>>>,
}

impl FailureReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure observed at a trigger boundary and render it for the user
    pub fn surface(&self, failure: &OperationFailure) -> String {
        error!(
            operation = %failure.operation(),
            cause = %failure.message(),
            "Observed operation failure"
        );
        self.push(FailureReport {
            operation: failure.operation().to_string(),
            channel: FailureChannel::Observed,
            message: failure.message(),
            detached: false,
            reported_at: Utc::now(),
        });
        format!("[Failure] {failure}")
    }

    /// Record a failure nobody observed before the operation was released
    pub(crate) fn record_unobserved(&self, label: &str, failure: &OperationFailure, detached: bool) {
        warn!(
            operation = %label,
            cause = %failure.message(),
            detached,
            "Unobserved operation failure dropped"
        );
        self.push(FailureReport {
            operation: label.to_string(),
            channel: FailureChannel::Unobserved,
            message: failure.message(),
            detached,
            reported_at: Utc::now(),
        });
    }

    fn push(&self, report: FailureReport) {
        self.reports.lock().push(report);
    }

    /// All reports in arrival order
    pub fn reports(&self) -> Vec<FailureReport> {
        self.reports.lock().clone()
    }

    pub fn observed(&self) -> Vec<FailureReport> {
        self.by_channel(FailureChannel::Observed)
    }

    pub fn unobserved(&self) -> Vec<FailureReport> {
        self.by_channel(FailureChannel::Unobserved)
    }

    fn by_channel(&self, channel: FailureChannel) -> Vec<FailureReport> {
        self.reports
            .lock()
            .iter()
            .filter(|report| report.channel == channel)
            .cloned()
            .collect()
    }
}
