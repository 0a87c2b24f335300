//! # Asynchronous Operation Handle
//!
//! [`AsyncOperation`] is a shared handle to a unit of asynchronous work with a
//! single terminal outcome. Every clone observes the same state; the outcome is
//! captured once and replayed to every observer.
//!
//! Observation points:
//!
//! - `op.await` suspends the calling task and resumes it on whichever lane
//!   polls that task
//! - [`AsyncOperation::blocking_wait`] parks the calling thread; called from the
//!   foreground lane it occupies the lane for the whole wait
//! - [`AsyncOperation::continue_with`] registers a continuation that runs on an
//!   explicit [`ResumeOn`] target once the operation is terminal

use parking_lot::{Condvar, Mutex};
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::execution::ForegroundContext;
use crate::failure::{FailureReporter, OperationFailure};
use crate::state_machine::{OperationEvent, OperationStateMachine, OperationStatus};

/// Terminal outcome of an operation
pub type Outcome<T> = Result<T, OperationFailure>;

type Continuation<T> = Box<dyn FnOnce(Outcome<T>) + Send>;

/// Where a continuation runs once the source operation is terminal
#[derive(Debug, Clone)]
pub enum ResumeOn {
    /// Queued on the foreground lane; runs only when the lane pumps
    Foreground(ForegroundContext),
    /// Runs on whichever worker completed the source; never needs the foreground
    Worker,
}

struct Inner<T> {
    machine: OperationStateMachine,
    outcome: Option<Outcome<T>>,
    continuations: Vec<Continuation<T>>,
    wakers: Vec<Waker>,
    observed: bool,
    detached: bool,
}

struct Shared<T> {
    id: Uuid,
    label: String,
    inner: Mutex<Inner<T>>,
    terminal: Condvar,
    reporter: FailureReporter,
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if let Some(Err(failure)) = &inner.outcome {
            if !inner.observed {
                self.reporter
                    .record_unobserved(&self.label, failure, inner.detached);
            }
        }
    }
}

/// Shared handle to a unit of asynchronous work
///
/// Dropping every handle to a failed operation without observing it routes the
/// failure to the [`FailureReporter`] unobserved channel. Use
/// [`AsyncOperation::detach`] to fire and forget on purpose.
#[must_use = "an operation nobody observes loses its failure to the unobserved channel"]
pub struct AsyncOperation<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for AsyncOperation<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> std::fmt::Debug for AsyncOperation<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncOperation")
            .field("id", &self.shared.id)
            .field("label", &self.shared.label)
            .field("status", &self.shared.inner.lock().machine.status())
            .finish()
    }
}

impl<T> AsyncOperation<T> {
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    pub fn label(&self) -> &str {
        &self.shared.label
    }

    pub fn status(&self) -> OperationStatus {
        self.shared.inner.lock().machine.status()
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub(crate) fn reporter(&self) -> &FailureReporter {
        &self.shared.reporter
    }
}

impl<T: Clone + Send + 'static> AsyncOperation<T> {
    /// Issue `work` on the worker pool; shorthand for [`crate::execution::WorkerPool::start`]
    pub fn start<Fut>(
        workers: &crate::execution::WorkerPool,
        label: impl Into<String>,
        work: Fut,
    ) -> Self
    where
        Fut: Future<Output = Outcome<T>> + Send + 'static,
    {
        workers.start(label, work)
    }

    /// Operation whose work already finished synchronously
    pub fn from_outcome(
        label: impl Into<String>,
        reporter: FailureReporter,
        outcome: Outcome<T>,
    ) -> Self {
        let operation = Self::pending(label, reporter);
        operation.mark_running();
        operation.complete(outcome);
        operation
    }

    pub(crate) fn pending(label: impl Into<String>, reporter: FailureReporter) -> Self {
        let label = label.into();
        Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4(),
                inner: Mutex::new(Inner {
                    machine: OperationStateMachine::new(label.clone()),
                    outcome: None,
                    continuations: Vec::new(),
                    wakers: Vec::new(),
                    observed: false,
                    detached: false,
                }),
                label,
                terminal: Condvar::new(),
                reporter,
            }),
        }
    }

    pub(crate) fn mark_running(&self) {
        let mut inner = self.shared.inner.lock();
        if let Err(error) = inner.machine.transition(&OperationEvent::Start) {
            warn!(operation = %self.shared.label, %error, "Ignoring duplicate start");
            return;
        }
        info!(
            operation = %self.shared.label,
            operation_id = %self.shared.id,
            "Operation running"
        );
    }

    /// Move to a terminal state and release every waiter
    ///
    /// The first outcome wins; later attempts are rejected by the state machine
    /// and logged.
    pub(crate) fn complete(&self, outcome: Outcome<T>) {
        let event = match &outcome {
            Ok(_) => OperationEvent::Complete,
            Err(failure) => OperationEvent::fail_with_error(failure.message()),
        };

        let (continuations, wakers) = {
            let mut inner = self.shared.inner.lock();
            if let Err(error) = inner.machine.transition(&event) {
                warn!(operation = %self.shared.label, %error, "Ignoring completion of settled operation");
                return;
            }
            let continuations = std::mem::take(&mut inner.continuations);
            if !continuations.is_empty() {
                inner.observed = true;
            }
            inner.outcome = Some(outcome.clone());
            (continuations, std::mem::take(&mut inner.wakers))
        };
        self.shared.terminal.notify_all();

        info!(
            operation = %self.shared.label,
            operation_id = %self.shared.id,
            status = if outcome.is_ok() { "completed" } else { "failed" },
            continuations = continuations.len(),
            awaiters = wakers.len(),
            "Operation settled"
        );

        for continuation in continuations {
            continuation(outcome.clone());
        }
        for waker in wakers {
            waker.wake();
        }
    }

    /// Park the calling thread until the operation is terminal
    ///
    /// Does not yield: called from the foreground lane, the lane stays occupied
    /// and pumps nothing until this returns. If the value can only be produced by
    /// a continuation queued on that same lane, this never returns.
    pub fn blocking_wait(&self) -> Outcome<T> {
        let _occupancy = ForegroundContext::occupy_current();
        let mut inner = self.shared.inner.lock();
        loop {
            let settled = inner.outcome.clone();
            if let Some(outcome) = settled {
                inner.observed = true;
                return outcome;
            }
            self.shared.terminal.wait(&mut inner);
        }
    }

    /// Blocking read of the outcome; returns immediately once terminal
    pub fn result(&self) -> Outcome<T> {
        self.blocking_wait()
    }

    /// Non-blocking read; `None` while the operation is still pending or running
    pub fn try_result(&self) -> Option<Outcome<T>> {
        let mut inner = self.shared.inner.lock();
        let outcome = inner.outcome.clone();
        if outcome.is_some() {
            inner.observed = true;
        }
        outcome
    }

    /// Run `continuation` on `target` once this operation is terminal
    ///
    /// Registering on an operation that is already terminal dispatches at once.
    pub fn on_terminal<F>(&self, target: ResumeOn, continuation: F)
    where
        F: FnOnce(Outcome<T>) + Send + 'static,
    {
        let label = self.shared.label.clone();
        let dispatch: Continuation<T> = Box::new(move |outcome| match target {
            ResumeOn::Worker => continuation(outcome),
            ResumeOn::Foreground(lane) => {
                if let Err(error) = lane.schedule_on_foreground(move || continuation(outcome)) {
                    warn!(operation = %label, %error, "Continuation dropped");
                }
            }
        });

        let mut inner = self.shared.inner.lock();
        let settled = inner.outcome.clone();
        match settled {
            Some(outcome) => {
                inner.observed = true;
                drop(inner);
                dispatch(outcome);
            }
            None => inner.continuations.push(dispatch),
        }
    }

    /// Derived operation produced by `map` once this one is terminal
    ///
    /// The derived operation stays pending until its continuation actually runs
    /// on `target`.
    pub fn continue_with<U, F>(
        &self,
        target: ResumeOn,
        label: impl Into<String>,
        map: F,
    ) -> AsyncOperation<U>
    where
        U: Clone + Send + 'static,
        F: FnOnce(Outcome<T>) -> Outcome<U> + Send + 'static,
    {
        let derived = AsyncOperation::pending(label, self.shared.reporter.clone());
        let handle = derived.clone();
        debug!(
            source = %self.shared.label,
            derived = %derived.label(),
            on_foreground = matches!(target, ResumeOn::Foreground(_)),
            "Continuation registered"
        );
        self.on_terminal(target, move |outcome| {
            handle.mark_running();
            handle.complete(map(outcome));
        });
        derived
    }

    /// Derived operation that settles on the completing worker
    ///
    /// Resuming after it never requires the foreground lane, so blocking on it
    /// from the foreground stalls the lane but cannot deadlock it.
    pub fn continue_without_context(&self) -> AsyncOperation<T> {
        let label = format!("{}.without_context", self.shared.label);
        self.continue_with(ResumeOn::Worker, label, |outcome| outcome)
    }

    /// Fire and forget: give up the handle on purpose
    ///
    /// A later failure goes to the reporter's unobserved channel and affects no
    /// other operation.
    pub fn detach(self) {
        self.shared.inner.lock().detached = true;
        debug!(operation = %self.shared.label, "Operation detached");
    }
}

/// Future returned by awaiting an [`AsyncOperation`]
pub struct Awaiting<T> {
    shared: Arc<Shared<T>>,
}

impl<T: Clone> Future for Awaiting<T> {
    type Output = Outcome<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let mut inner = self.shared.inner.lock();
        let settled = inner.outcome.clone();
        if let Some(outcome) = settled {
            inner.observed = true;
            return Poll::Ready(outcome);
        }
        if !inner.wakers.iter().any(|waker| waker.will_wake(cx.waker())) {
            inner.wakers.push(cx.waker().clone());
        }
        Poll::Pending
    }
}

impl<T: Clone> IntoFuture for AsyncOperation<T> {
    type Output = Outcome<T>;
    type IntoFuture = Awaiting<T>;

    fn into_future(self) -> Self::IntoFuture {
        Awaiting {
            shared: self.shared,
        }
    }
}

impl<T: Clone> IntoFuture for &AsyncOperation<T> {
    type Output = Outcome<T>;
    type IntoFuture = Awaiting<T>;

    fn into_future(self) -> Self::IntoFuture {
        Awaiting {
            shared: Arc::clone(&self.shared),
        }
    }
}
