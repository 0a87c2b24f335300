use std::fmt;
use std::sync::Arc;

/// Failure raised by the unit of work inside an operation
///
/// Captured once at the point of failure and shared by every observer: all
/// awaiters of the same operation receive clones pointing at the same cause.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Operation '{operation}' failed: {cause}")]
pub struct OperationFailure {
    operation: String,
    cause: Arc<anyhow::Error>,
}

impl OperationFailure {
    pub fn new(operation: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        Self {
            operation: operation.into(),
            cause: Arc::new(cause.into()),
        }
    }

    /// Failure carrying a plain message as its cause
    pub fn msg<M>(operation: impl Into<String>, message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self::new(operation, anyhow::Error::msg(message))
    }

    /// Label of the operation that raised the failure
    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn cause(&self) -> &anyhow::Error {
        &self.cause
    }

    /// Message of the root cause without the operation prefix
    pub fn message(&self) -> String {
        self.cause.to_string()
    }

    /// True when both values were cloned from the same captured failure
    pub fn is_same_failure(&self, other: &OperationFailure) -> bool {
        Arc::ptr_eq(&self.cause, &other.cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_operation_and_cause() {
        let failure = OperationFailure::msg("DoAsyncTaskWithError", "I'm sorry!");
        assert_eq!(
            failure.to_string(),
            "Operation 'DoAsyncTaskWithError' failed: I'm sorry!"
        );
        assert_eq!(failure.message(), "I'm sorry!");
    }

    #[test]
    fn test_clones_share_identity() {
        let failure = OperationFailure::msg("op", "boom");
        let replay = failure.clone();
        let other = OperationFailure::msg("op", "boom");

        assert!(failure.is_same_failure(&replay));
        assert!(!failure.is_same_failure(&other));
    }
}
