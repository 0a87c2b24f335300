//! # Orchestrator
//!
//! Issues the demo operations and composes them with the four strategies:
//! sequential await, blocking wait, blocking wait on a context-freed operation
//! and the join-all combinator. Each `on_trigger_*` entry point is what an
//! external trigger (a button, the CLI) calls; it returns the text the trigger
//! renders.
//!
//! Async entry points are meant to run as foreground handlers via
//! [`Orchestrator::fire`]; the synchronous ones occupy whatever thread calls
//! them until they return.

use crossbeam::channel::{self, Receiver, RecvError, RecvTimeoutError};
use std::future::Future;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

use super::narrative::Narrative;
use super::resource::{ResourceFetcher, SimulatedFetcher};
use super::trigger::Trigger;
use crate::config::{ConfigManager, DemoConfig};
use crate::constants::events;
use crate::error::Result;
use crate::execution::{ForegroundContext, WorkerPool};
use crate::failure::{FailureReporter, OperationFailure};
use crate::logging::{log_operation, log_trigger};
use crate::operation::{AsyncOperation, CompositeWait, Outcome, ResumeOn};

/// Owns the foreground lane, the worker pool and the failure reporter
///
/// Cloning is cheap and every clone drives the same lane and pool. Progress
/// text is not kept here: each trigger invocation writes into its own
/// [`Narrative`].
#[derive(Debug, Clone)]
pub struct Orchestrator {
    config: Arc<DemoConfig>,
    foreground: ForegroundContext,
    workers: WorkerPool,
    reporter: FailureReporter,
    fetcher: Arc<dyn ResourceFetcher>,
}

/// A trigger posted to the foreground lane
///
/// The narrative fills in while the handler runs, so it stays readable even
/// when the handler never finishes.
#[derive(Debug)]
pub struct FiredTrigger {
    trigger: Trigger,
    narrative: Narrative,
    receiver: Receiver<String>,
}

impl FiredTrigger {
    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    pub fn narrative(&self) -> &Narrative {
        &self.narrative
    }

    /// Wait for the rendered text
    pub fn recv(&self) -> std::result::Result<String, RecvError> {
        self.receiver.recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> std::result::Result<String, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

impl Orchestrator {
    /// Build an orchestrator backed by the simulated resource fetcher
    pub fn new(config: DemoConfig) -> Result<Self> {
        let fetcher = Arc::new(SimulatedFetcher::from_config(&config.resource));
        Self::with_fetcher(config, fetcher)
    }

    pub fn from_manager(manager: &ConfigManager) -> Result<Self> {
        Self::new(manager.config().clone())
    }

    pub fn with_fetcher(config: DemoConfig, fetcher: Arc<dyn ResourceFetcher>) -> Result<Self> {
        config.validate()?;

        let reporter = FailureReporter::new();
        let workers = WorkerPool::new(&config.runtime, reporter.clone())?;
        let foreground =
            ForegroundContext::start(config.runtime.foreground_thread_name.clone(), reporter.clone())?;

        info!(
            foreground = %foreground.name(),
            worker_threads = workers.worker_threads(),
            "Orchestrator ready"
        );

        Ok(Self {
            config: Arc::new(config),
            foreground,
            workers,
            reporter,
            fetcher,
        })
    }

    pub fn config(&self) -> &DemoConfig {
        &self.config
    }

    pub fn foreground(&self) -> &ForegroundContext {
        &self.foreground
    }

    pub fn workers(&self) -> &WorkerPool {
        &self.workers
    }

    pub fn reporter(&self) -> &FailureReporter {
        &self.reporter
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Uppercase `label` on a worker after `duration`
    pub fn do_task_async(
        &self,
        narrative: &Narrative,
        label: &str,
        duration: Duration,
    ) -> AsyncOperation<String> {
        let tag = format!("Do{label}Async");
        narrative.push(format!("[{tag}] Working.........."));

        let narrative = narrative.clone();
        let message = label.to_string();
        self.workers.start(label, async move {
            tokio::time::sleep(duration).await;
            narrative.push(format!("[{tag}] Done.........."));
            Ok::<_, OperationFailure>(message.to_uppercase())
        })
    }

    /// Same work as [`Orchestrator::do_task_async`] as a plain blocking call
    pub fn do_task_blocking(&self, narrative: &Narrative, label: &str, duration: Duration) -> String {
        let tag = format!("Do{label}");
        narrative.push(format!("[{tag}] Working.........."));
        thread::sleep(duration);
        narrative.push(format!("[{tag}] Done.........."));
        label.to_uppercase()
    }

    pub fn first_task(&self, narrative: &Narrative) -> AsyncOperation<String> {
        let tasks = &self.config.tasks;
        self.do_task_async(narrative, &tasks.first_label, tasks.first_duration())
    }

    pub fn second_task(&self, narrative: &Narrative) -> AsyncOperation<String> {
        let tasks = &self.config.tasks;
        self.do_task_async(narrative, &tasks.second_label, tasks.second_duration())
    }

    /// Operation that fails with the configured message after the configured delay
    pub fn do_async_task_with_error(&self, narrative: &Narrative) -> AsyncOperation<()> {
        self.issue_failing(narrative, &self.config.tasks.failing_label)
    }

    fn issue_failing(&self, narrative: &Narrative, label: &str) -> AsyncOperation<()> {
        let tasks = &self.config.tasks;
        narrative.push(format!("[{label}] Working.........."));

        let delay = tasks.failing_delay();
        let failure_label = label.to_string();
        let message = tasks.failure_message.clone();
        self.workers.start(label, async move {
            tokio::time::sleep(delay).await;
            Err::<(), _>(OperationFailure::msg(failure_label, message))
        })
    }

    fn issue_fetch(&self) -> AsyncOperation<String> {
        let url = self.config.resource.url.clone();
        let fetcher = Arc::clone(&self.fetcher);
        let label = format!("fetch {url}");
        let failure_label = label.clone();

        self.workers.start(label, async move {
            fetcher
                .fetch(&url)
                .await
                .map_err(|cause| OperationFailure::new(failure_label, cause))
        })
    }

    fn do_independent_work(&self, narrative: &Narrative) {
        narrative.push("[DoIndependentWork] Working . . . . . . .");
    }

    /// Fetch the resource and measure it, resuming on the foreground lane
    ///
    /// The length is only produced once the foreground pumps the measuring
    /// continuation. Blocking on the result from the foreground never returns.
    pub fn access_resource(&self, narrative: &Narrative) -> AsyncOperation<usize> {
        let fetch = self.issue_fetch();
        self.do_independent_work(narrative);
        fetch.continue_with(
            ResumeOn::Foreground(self.foreground.clone()),
            "access_resource",
            |outcome| outcome.map(|body| body.len()),
        )
    }

    /// Fetch the resource and measure it without ever needing the foreground
    pub fn access_resource_without_context(&self, narrative: &Narrative) -> AsyncOperation<usize> {
        let fetch = self.issue_fetch().continue_without_context();
        self.do_independent_work(narrative);
        fetch.continue_with(ResumeOn::Worker, "access_resource.without_context", |outcome| {
            outcome.map(|body| body.len())
        })
    }

    // =========================================================================
    // Composition strategies
    // =========================================================================

    /// Issue Task1 and await it, then issue Task2 and await it
    pub async fn sequential_await(&self, narrative: &Narrative) -> Outcome<(String, String)> {
        let first = self.first_task(narrative).await?;
        let second = self.second_task(narrative).await?;
        Ok((first, second))
    }

    /// Issue both tasks, then join them; the join overlaps their durations
    pub fn join_all(&self, narrative: &Narrative) -> CompositeWait<String> {
        let first = self.first_task(narrative);
        let second = self.second_task(narrative);
        CompositeWait::when_all("join_all", vec![first, second])
    }

    // =========================================================================
    // Trigger entry points
    // =========================================================================

    /// Observed failure first, then the resource length
    pub async fn on_trigger_start(&self) -> String {
        self.run_start(&Narrative::new()).await
    }

    pub async fn on_trigger_sequential(&self) -> String {
        self.run_sequential(&Narrative::new()).await
    }

    /// Both tasks as blocking calls; holds the caller for the sum of durations
    pub fn on_trigger_synchronous(&self) -> String {
        self.run_synchronous(&Narrative::new())
    }

    /// Blocking wait on a foreground-resuming operation
    ///
    /// Called on the foreground lane this never returns: the lane is occupied by
    /// the wait and the continuation that would produce the length sits in its
    /// queue. Called from any other thread it completes normally.
    pub fn on_trigger_deadlock(&self) -> String {
        self.run_deadlock(&Narrative::new())
    }

    /// Blocking wait on the context-freed operation; stalls but returns
    pub fn on_trigger_deadlock_free(&self) -> String {
        self.run_deadlock_free(&Narrative::new())
    }

    /// Join both tasks and read each result; a failed member renders as its failure
    pub async fn on_trigger_join_all(&self) -> (String, String) {
        self.run_join_all(&Narrative::new()).await
    }

    /// Issue the failing operation and give up its handle
    ///
    /// The failure lands on the reporter's unobserved channel when the work
    /// finishes; nothing else is affected.
    pub fn fire_and_forget_failure(&self, narrative: &Narrative) {
        self.issue_failing(narrative, &self.config.tasks.fire_and_forget_label)
            .detach();
    }

    pub fn on_trigger_fire_and_forget(&self) -> String {
        self.run_fire_and_forget(&Narrative::new())
    }

    #[instrument(skip(self, narrative))]
    async fn run_start(&self, narrative: &Narrative) -> String {
        let started = self.begin(Trigger::Start);

        if let Err(failure) = self.do_async_task_with_error(narrative).await {
            narrative.push(self.reporter.surface(&failure));
        }

        let length = self.access_resource(narrative).await;
        self.render_length(narrative, length);

        self.finish(Trigger::Start, narrative, started)
    }

    #[instrument(skip(self, narrative))]
    async fn run_sequential(&self, narrative: &Narrative) -> String {
        let started = self.begin(Trigger::Sequential);

        match self.sequential_await(narrative).await {
            Ok((first, second)) => {
                log_operation(
                    "sequential_await",
                    "completed",
                    Some(started.elapsed().as_millis() as u64),
                    None,
                );
                self.render_results(narrative, &first, &second);
            }
            Err(failure) => narrative.push(self.reporter.surface(&failure)),
        }

        self.finish(Trigger::Sequential, narrative, started)
    }

    #[instrument(skip(self, narrative))]
    fn run_synchronous(&self, narrative: &Narrative) -> String {
        let started = self.begin(Trigger::Synchronous);
        let tasks = &self.config.tasks;

        let first = self.do_task_blocking(narrative, &tasks.first_label, tasks.first_duration());
        let second = self.do_task_blocking(narrative, &tasks.second_label, tasks.second_duration());
        self.render_results(narrative, &first, &second);

        self.finish(Trigger::Synchronous, narrative, started)
    }

    #[instrument(skip(self, narrative))]
    fn run_deadlock(&self, narrative: &Narrative) -> String {
        let started = self.begin(Trigger::Deadlock);
        narrative.push("[DeadlockTest] Working..........");

        let length = self.access_resource(narrative).blocking_wait();
        self.render_length(narrative, length);

        self.finish(Trigger::Deadlock, narrative, started)
    }

    #[instrument(skip(self, narrative))]
    fn run_deadlock_free(&self, narrative: &Narrative) -> String {
        let started = self.begin(Trigger::DeadlockFree);
        narrative.push("[DeadlockFreeTest] Working..........");

        let length = self.access_resource_without_context(narrative).blocking_wait();
        self.render_length(narrative, length);

        self.finish(Trigger::DeadlockFree, narrative, started)
    }

    #[instrument(skip(self, narrative))]
    async fn run_join_all(&self, narrative: &Narrative) -> (String, String) {
        let started = self.begin(Trigger::JoinAll);

        let join = self.join_all(narrative);
        if let Err(failure) = (&join).await {
            debug!(%failure, "Join resolved with a member failure");
        }

        let results = self.render_join(narrative, &join);
        self.finish(Trigger::JoinAll, narrative, started);
        results
    }

    #[instrument(skip(self, narrative))]
    fn run_fire_and_forget(&self, narrative: &Narrative) -> String {
        let started = self.begin(Trigger::FireAndForget);
        self.fire_and_forget_failure(narrative);
        self.finish(Trigger::FireAndForget, narrative, started)
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    /// Post `trigger` to the foreground lane as an event handler
    ///
    /// The returned handle yields the rendered text once the handler finishes.
    /// For [`Trigger::Deadlock`] it never does.
    pub fn fire(&self, trigger: Trigger) -> Result<FiredTrigger> {
        debug!(
            %trigger,
            blocks_foreground = trigger.blocks_foreground(),
            "Posting trigger to the foreground lane"
        );

        let narrative = Narrative::new();
        let orchestrator = self.clone();
        let handler_narrative = narrative.clone();
        let receiver = match trigger {
            Trigger::Synchronous => self
                .foreground
                .invoke(move || orchestrator.run_synchronous(&handler_narrative)),
            Trigger::Deadlock => self
                .foreground
                .invoke(move || orchestrator.run_deadlock(&handler_narrative)),
            Trigger::DeadlockFree => self
                .foreground
                .invoke(move || orchestrator.run_deadlock_free(&handler_narrative)),
            Trigger::FireAndForget => self
                .foreground
                .invoke(move || orchestrator.run_fire_and_forget(&handler_narrative)),
            Trigger::Start => self.spawn_handler(trigger, async move {
                orchestrator.run_start(&handler_narrative).await
            }),
            Trigger::Sequential => self.spawn_handler(trigger, async move {
                orchestrator.run_sequential(&handler_narrative).await
            }),
            Trigger::JoinAll => self.spawn_handler(trigger, async move {
                orchestrator.run_join_all(&handler_narrative).await;
                handler_narrative.render()
            }),
        }?;

        Ok(FiredTrigger {
            trigger,
            narrative,
            receiver,
        })
    }

    fn spawn_handler<Fut>(&self, trigger: Trigger, handler: Fut) -> Result<Receiver<String>>
    where
        Fut: Future<Output = String> + Send + 'static,
    {
        let (reply, receiver) = channel::bounded(1);
        let operation = self.foreground.spawn(trigger.as_str(), async move {
            Ok::<_, OperationFailure>(handler.await)
        })?;
        operation.on_terminal(ResumeOn::Worker, move |outcome| {
            if let Ok(rendered) = outcome {
                let _ = reply.send(rendered);
            }
        });
        Ok(receiver)
    }

    /// Stop the foreground lane after the handlers already queued
    pub fn shutdown(&self) {
        self.foreground.shutdown();
    }

    fn begin(&self, trigger: Trigger) -> Instant {
        log_trigger(trigger.as_str(), events::TRIGGER_STARTED, None, None);
        Instant::now()
    }

    fn finish(&self, trigger: Trigger, narrative: &Narrative, started: Instant) -> String {
        let rendered = narrative.render();
        log_trigger(
            trigger.as_str(),
            events::TRIGGER_COMPLETED,
            Some(started.elapsed().as_millis() as u64),
            Some(&rendered),
        );
        rendered
    }

    /// Each member's slot in issue order; a failed member renders as its failure
    fn render_join(&self, narrative: &Narrative, join: &CompositeWait<String>) -> (String, String) {
        let mut rendered = join.results().into_iter().map(|result| match result {
            Some(Ok(value)) => value,
            Some(Err(failure)) => self.reporter.surface(&failure),
            None => String::new(),
        });
        let first = rendered.next().unwrap_or_default();
        let second = rendered.next().unwrap_or_default();

        narrative.push("Finished both methods.");
        self.render_results(narrative, &first, &second);
        (first, second)
    }

    fn render_results(&self, narrative: &Narrative, first: &str, second: &str) {
        narrative.push(format!("Result 1: {first}"));
        narrative.push(format!("Result 2: {second}"));
    }

    fn render_length(&self, narrative: &Narrative, length: Outcome<usize>) {
        match length {
            Ok(length) => narrative.push(format!("Length of the downloaded string: {length}.")),
            Err(failure) => narrative.push(self.reporter.surface(&failure)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::resource::FailingFetcher;
    use crate::state_machine::OperationStatus;

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(DemoConfig::for_testing()).unwrap()
    }

    #[test]
    fn test_do_task_async_uppercases_and_narrates() {
        let orchestrator = orchestrator();
        let narrative = Narrative::new();
        let operation = orchestrator.do_task_async(&narrative, "Task1", Duration::from_millis(10));

        assert_eq!(operation.status(), OperationStatus::Running);
        assert_eq!(operation.blocking_wait().unwrap(), "TASK1");
        assert_eq!(
            narrative.lines(),
            vec![
                "[DoTask1Async] Working..........".to_string(),
                "[DoTask1Async] Done..........".to_string(),
            ]
        );
    }

    #[test]
    fn test_failing_operation_carries_configured_message() {
        let orchestrator = orchestrator();
        let failure = orchestrator
            .do_async_task_with_error(&Narrative::new())
            .blocking_wait()
            .unwrap_err();

        assert_eq!(failure.operation(), "DoAsyncTaskWithError");
        assert_eq!(failure.message(), "I'm sorry!");
    }

    #[test]
    fn test_access_resource_off_lane_measures_body() {
        let orchestrator = orchestrator();
        let length = orchestrator
            .access_resource(&Narrative::new())
            .blocking_wait()
            .unwrap();
        assert_eq!(length, orchestrator.config().resource.content_length);
    }

    #[test]
    fn test_fetch_failure_renders_as_failure_message() {
        let orchestrator = Orchestrator::with_fetcher(
            DemoConfig::for_testing(),
            Arc::new(FailingFetcher::new("connection refused")),
        )
        .unwrap();

        let rendered = orchestrator.on_trigger_deadlock_free();
        assert!(rendered.contains("[Failure]"));
        assert!(rendered.contains("connection refused"));
        assert_eq!(orchestrator.reporter().observed().len(), 1);
    }

    #[test]
    fn test_join_renders_failed_member_in_its_slot() {
        let orchestrator = orchestrator();
        let narrative = Narrative::new();

        let first = orchestrator.first_task(&narrative);
        let failing = orchestrator.workers().start("DoAsyncTaskWithError", async {
            Err::<String, _>(OperationFailure::msg("DoAsyncTaskWithError", "I'm sorry!"))
        });
        let join = CompositeWait::when_all("join_all", vec![first, failing]);
        assert!(join.wait().is_err());

        let (first, second) = orchestrator.render_join(&narrative, &join);

        assert_eq!(first, "TASK1");
        assert!(
            second.starts_with("[Failure] Operation 'DoAsyncTaskWithError' failed: I'm sorry!"),
            "unexpected slot: {second}"
        );
        assert!(narrative.lines().contains(&"Finished both methods.".to_string()));
        assert!(narrative.lines().contains(&format!("Result 2: {second}")));
        assert_eq!(orchestrator.reporter().observed().len(), 1);
    }

    #[test]
    fn test_trigger_entry_points_render_only_their_own_lines() {
        let orchestrator = orchestrator();

        let first = orchestrator.on_trigger_synchronous();
        let second = orchestrator.on_trigger_synchronous();

        assert_eq!(first, second);
        assert_eq!(first.lines().count(), 6);
    }

    #[test]
    fn test_fire_and_forget_uses_its_own_label() {
        let orchestrator = orchestrator();
        let narrative = Narrative::new();

        orchestrator.fire_and_forget_failure(&narrative);

        assert_eq!(narrative.render(), "[DoAsyncVoidWithError] Working..........");
    }

    #[test]
    fn test_shutdown_stops_accepting_triggers() {
        let orchestrator = orchestrator();
        orchestrator.shutdown();

        let mut rejected = false;
        for _ in 0..100 {
            if orchestrator.fire(Trigger::FireAndForget).is_err() {
                rejected = true;
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert!(rejected, "lane still accepted work after shutdown");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = DemoConfig::for_testing();
        config.runtime.worker_threads = 0;
        assert!(Orchestrator::new(config).is_err());
    }
}
