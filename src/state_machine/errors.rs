use super::states::OperationStatus;

/// Errors raised when an operation lifecycle transition is rejected
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    #[error("Invalid state transition from {from} on event '{event}'")]
    InvalidTransition {
        from: OperationStatus,
        event: &'static str,
    },
}

pub type StateMachineResult<T> = Result<T, StateMachineError>;
