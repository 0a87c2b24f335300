//! Blocking waits issued from the foreground lane.
//!
//! The deadlock is real: the lane thread stays parked for the rest of the test
//! process, so every scenario gets its own orchestrator.

mod common;

use async_orchestration::orchestration::Trigger;
use common::{fire_and_wait, test_orchestrator, wait_until};
use std::time::Duration;

#[test]
fn test_blocking_on_foreground_resuming_operation_never_returns() {
    let orchestrator = test_orchestrator();
    let probe = orchestrator.config().runtime.deadlock_probe();

    let fired = orchestrator.fire(Trigger::Deadlock).unwrap();

    assert!(
        fired.recv_timeout(probe).is_err(),
        "deadlock trigger returned on the foreground"
    );

    let lane = orchestrator.foreground();
    assert!(lane.is_occupied());
    // The measuring continuation is parked behind the blocked handler
    assert!(lane.pending_continuations() >= 1);
    assert_eq!(
        fired.narrative().lines(),
        vec![
            "[DeadlockTest] Working..........".to_string(),
            "[DoIndependentWork] Working . . . . . . .".to_string(),
        ]
    );
}

#[test]
fn test_deadlocked_lane_pumps_nothing_else() {
    let orchestrator = test_orchestrator();
    let probe = orchestrator.config().runtime.deadlock_probe();

    let _stuck = orchestrator.fire(Trigger::Deadlock).unwrap();
    let behind = orchestrator.foreground().invoke(|| "ran").unwrap();

    assert!(behind.recv_timeout(probe).is_err());
}

#[test]
fn test_context_freed_blocking_wait_returns_within_bound() {
    let orchestrator = test_orchestrator();
    let config = orchestrator.config().clone();

    let (rendered, elapsed) = fire_and_wait(&orchestrator, Trigger::DeadlockFree);

    assert!(elapsed >= config.resource.latency(), "returned before the fetch: {elapsed:?}");
    assert!(elapsed < config.resource.latency() * 5, "stall too long: {elapsed:?}");
    assert!(rendered.starts_with("[DeadlockFreeTest] Working.........."));
    assert!(rendered.ends_with(&format!(
        "Length of the downloaded string: {}.",
        config.resource.content_length
    )));
    assert!(!orchestrator.foreground().is_occupied());
}

#[test]
fn test_deadlock_pattern_off_the_foreground_completes() {
    let orchestrator = test_orchestrator();
    let content_length = orchestrator.config().resource.content_length;

    // A plain thread is not the lane, so the continuation can still be pumped
    let rendered = orchestrator.on_trigger_deadlock();

    assert!(rendered.ends_with(&format!(
        "Length of the downloaded string: {content_length}."
    )));
    assert!(!orchestrator.foreground().is_occupied());
}

#[test]
fn test_lane_recovers_after_context_freed_stall() {
    let orchestrator = test_orchestrator();

    let _ = fire_and_wait(&orchestrator, Trigger::DeadlockFree);
    let after = orchestrator.foreground().invoke(|| 11).unwrap();

    assert_eq!(after.recv_timeout(Duration::from_secs(2)).unwrap(), 11);
    assert!(wait_until(Duration::from_secs(1), || {
        orchestrator.foreground().pending_continuations() == 0
    }));
}
