//! Observed versus unobserved failures.

mod common;

use async_orchestration::failure::FailureChannel;
use async_orchestration::orchestration::{Narrative, Trigger};
use async_orchestration::OperationStatus;
use common::{fire_and_wait, test_orchestrator, wait_until};
use std::future::IntoFuture;
use std::time::Duration;

#[test]
fn test_awaited_failure_is_the_same_failure_for_every_observer() {
    let orchestrator = test_orchestrator();
    let operation = orchestrator.do_async_task_with_error(&Narrative::new());

    let awaited = orchestrator
        .workers()
        .handle()
        .block_on((&operation).into_future())
        .unwrap_err();
    let blocked = operation.blocking_wait().unwrap_err();
    let read = operation.try_result().unwrap().unwrap_err();

    assert!(awaited.is_same_failure(&blocked));
    assert!(blocked.is_same_failure(&read));
    assert_eq!(operation.status(), OperationStatus::Failed);
}

#[test]
fn test_fire_and_forget_failure_goes_to_unobserved_channel_only() {
    let orchestrator = test_orchestrator();
    let delay = orchestrator.config().tasks.failing_delay();

    let (rendered, _) = fire_and_wait(&orchestrator, Trigger::FireAndForget);
    assert_eq!(rendered, "[DoAsyncVoidWithError] Working..........");

    let reporter = orchestrator.reporter().clone();
    assert!(wait_until(delay * 10, || !reporter.unobserved().is_empty()));

    let reports = reporter.reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].channel, FailureChannel::Unobserved);
    assert_eq!(reports[0].operation, "DoAsyncVoidWithError");
    assert!(reports[0].detached);
    assert_eq!(reports[0].message, "I'm sorry!");
}

#[test]
fn test_unobserved_failure_does_not_affect_other_operations() {
    let orchestrator = test_orchestrator();

    orchestrator.fire_and_forget_failure(&Narrative::new());
    let (first, second) = orchestrator
        .workers()
        .handle()
        .block_on(orchestrator.on_trigger_join_all());

    assert_eq!(first, "TASK1");
    assert_eq!(second, "TASK2");
    assert!(orchestrator.reporter().observed().is_empty());
}

#[test]
fn test_dropped_failing_handle_is_reported_unobserved() {
    let orchestrator = test_orchestrator();
    let reporter = orchestrator.reporter().clone();
    let delay = orchestrator.config().tasks.failing_delay();

    drop(orchestrator.do_async_task_with_error(&Narrative::new()));

    assert!(wait_until(delay * 10, || reporter.unobserved().len() == 1));
    assert!(!reporter.unobserved()[0].detached);
}

#[test]
fn test_observed_failure_is_surfaced_not_reported_as_unobserved() {
    let orchestrator = test_orchestrator();
    let (rendered, _) = fire_and_wait(&orchestrator, Trigger::Start);

    assert!(rendered.contains("[Failure] Operation 'DoAsyncTaskWithError' failed: I'm sorry!"));

    // Allow every handle to the failed operation to be released
    std::thread::sleep(Duration::from_millis(50));
    let reporter = orchestrator.reporter();
    assert_eq!(reporter.observed().len(), 1);
    assert!(reporter.unobserved().is_empty());
}
