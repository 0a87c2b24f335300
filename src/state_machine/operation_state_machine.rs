use super::{
    errors::{StateMachineError, StateMachineResult},
    events::OperationEvent,
    states::OperationStatus,
};
use tracing::debug;

/// Lifecycle tracker for a single asynchronous operation
///
/// Owns only the status; the value or failure lives next to it in the
/// operation's shared state. Terminal states accept no further events.
#[derive(Debug, Clone)]
pub struct OperationStateMachine {
    label: String,
    status: OperationStatus,
    transitions: u32,
}

impl OperationStateMachine {
    /// Create a new state machine in the pending state
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            status: OperationStatus::default(),
            transitions: 0,
        }
    }

    /// Current status
    pub fn status(&self) -> OperationStatus {
        self.status
    }

    /// Number of transitions applied so far
    pub fn transition_count(&self) -> u32 {
        self.transitions
    }

    /// Attempt to transition the operation state
    pub fn transition(&mut self, event: &OperationEvent) -> StateMachineResult<OperationStatus> {
        let target = determine_target_state(self.status, event)?;

        debug!(
            operation = %self.label,
            from = %self.status,
            to = %target,
            event = event.event_type(),
            error = event.error_message(),
            "Operation state transition"
        );

        self.status = target;
        self.transitions += 1;
        Ok(target)
    }
}

/// Determine the target state based on current state and event
pub fn determine_target_state(
    current: OperationStatus,
    event: &OperationEvent,
) -> StateMachineResult<OperationStatus> {
    let target = match (current, event) {
        (OperationStatus::Pending, OperationEvent::Start) => OperationStatus::Running,
        (OperationStatus::Running, OperationEvent::Complete) => OperationStatus::Completed,
        (OperationStatus::Running, OperationEvent::Fail(_)) => OperationStatus::Failed,

        (from, _) => {
            return Err(StateMachineError::InvalidTransition {
                from,
                event: event.event_type(),
            })
        }
    };

    Ok(target)
}
