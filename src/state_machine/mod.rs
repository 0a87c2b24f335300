// State machine module for asynchronous operation lifecycles
//
// Pending -> Running -> {Completed | Failed}. Terminal states are final; a second
// completion attempt is rejected rather than applied.

pub mod errors;
pub mod events;
pub mod operation_state_machine;
pub mod states;

// Re-export main types for convenient access
pub use errors::{StateMachineError, StateMachineResult};
pub use events::OperationEvent;
pub use operation_state_machine::{determine_target_state, OperationStateMachine};
pub use states::OperationStatus;
