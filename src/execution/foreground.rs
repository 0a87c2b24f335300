//! # Foreground Execution Context
//!
//! The single logical "foreground" lane, the analogue of a UI thread. It is a
//! dedicated OS thread pumping a FIFO queue of continuations one at a time.
//!
//! Two things share the lane:
//!
//! - synchronous event handlers posted with [`ForegroundContext::invoke`]
//! - asynchronous handlers posted with [`ForegroundContext::spawn`], whose
//!   wake-ups re-enter the same queue, so every resumption after an `await`
//!   runs on the foreground again
//!
//! A blocking wait issued from the lane marks it occupied for its duration. While
//! occupied the lane does not pump, so any continuation queued behind the
//! blocking call can never run. When that continuation is exactly what the
//! blocking call waits for, the lane deadlocks; nothing here detects it.

use crossbeam::channel::{self, Receiver, Sender};
use futures::future::BoxFuture;
use futures::task::{waker_ref, ArcWake};
use parking_lot::Mutex;
use std::cell::RefCell;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::task::Context;
use std::thread;
use tracing::{debug, error, info, warn};

use crate::error::{OrchestrationError, Result};
use crate::failure::{FailureReporter, OperationFailure};
use crate::operation::AsyncOperation;

thread_local! {
    static CURRENT: RefCell<Option<Weak<ForegroundState>>> = const { RefCell::new(None) };
}

enum ForegroundJob {
    Run(Box<dyn FnOnce() + Send>),
    Poll(Arc<ForegroundTask>),
    Shutdown,
}

struct ForegroundState {
    name: String,
    sender: Sender<ForegroundJob>,
    occupied: AtomicBool,
    reporter: FailureReporter,
}

impl Drop for ForegroundState {
    fn drop(&mut self) {
        let _ = self.sender.send(ForegroundJob::Shutdown);
    }
}

/// Handle to the foreground lane
#[derive(Clone)]
pub struct ForegroundContext {
    state: Arc<ForegroundState>,
}

impl std::fmt::Debug for ForegroundContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForegroundContext")
            .field("name", &self.state.name)
            .field("occupied", &self.is_occupied())
            .field("pending_continuations", &self.pending_continuations())
            .finish()
    }
}

impl ForegroundContext {
    /// Start the foreground lane on a dedicated thread
    pub fn start(name: impl Into<String>, reporter: FailureReporter) -> Result<Self> {
        let name = name.into();
        let (sender, receiver) = channel::unbounded();
        let state = Arc::new(ForegroundState {
            name: name.clone(),
            sender,
            occupied: AtomicBool::new(false),
            reporter,
        });

        let weak = Arc::downgrade(&state);
        thread::Builder::new()
            .name(name.clone())
            .spawn(move || pump(weak, receiver))
            .map_err(|e| OrchestrationError::Runtime(format!("failed to start {name}: {e}")))?;

        info!(lane = %name, "Foreground lane started");
        Ok(Self { state })
    }

    /// The lane the calling thread is pumping, if any
    pub fn current() -> Option<ForegroundContext> {
        CURRENT.with(|current| {
            current
                .borrow()
                .as_ref()
                .and_then(Weak::upgrade)
                .map(|state| ForegroundContext { state })
        })
    }

    /// True when called from this lane's own thread
    pub fn is_current(&self) -> bool {
        Self::current().is_some_and(|current| Arc::ptr_eq(&current.state, &self.state))
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Whether a blocking wait currently holds the lane
    pub fn is_occupied(&self) -> bool {
        self.state.occupied.load(Ordering::Acquire)
    }

    /// Number of continuations queued and not yet pumped
    pub fn pending_continuations(&self) -> usize {
        self.state.sender.len()
    }

    /// Mark the lane occupied until the returned guard is released or dropped
    pub fn occupy(&self) -> OccupancyGuard {
        let previously = self.state.occupied.swap(true, Ordering::AcqRel);
        debug!(
            lane = %self.state.name,
            queued = self.pending_continuations(),
            "Foreground occupied by blocking wait"
        );
        OccupancyGuard {
            state: Arc::clone(&self.state),
            previously,
        }
    }

    /// Occupy the lane only if the caller is running on it
    pub(crate) fn occupy_current() -> Option<OccupancyGuard> {
        Self::current().map(|lane| lane.occupy())
    }

    /// Append a continuation to the lane's FIFO queue
    pub fn schedule_on_foreground<F>(&self, continuation: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.send(ForegroundJob::Run(Box::new(continuation)))?;
        debug!(
            lane = %self.state.name,
            queued = self.pending_continuations(),
            occupied = self.is_occupied(),
            "Continuation scheduled on foreground"
        );
        Ok(())
    }

    /// Post a synchronous handler and hand back a channel for its result
    ///
    /// The receiver is the caller's only view of the handler; a handler that
    /// deadlocks the lane simply never sends.
    pub fn invoke<R, F>(&self, handler: F) -> Result<Receiver<R>>
    where
        R: Send + 'static,
        F: FnOnce() -> R + Send + 'static,
    {
        let (reply, receiver) = channel::bounded(1);
        self.schedule_on_foreground(move || {
            let _ = reply.send(handler());
        })?;
        Ok(receiver)
    }

    /// Start an asynchronous handler on the lane
    ///
    /// The handler is polled only by this lane. Every wake-up, including the one
    /// fired when an awaited operation completes on a worker, is queued behind
    /// whatever the lane is doing at that moment.
    pub fn spawn<T, Fut>(&self, label: impl Into<String>, work: Fut) -> Result<AsyncOperation<T>>
    where
        T: Clone + Send + 'static,
        Fut: Future<Output = std::result::Result<T, OperationFailure>> + Send + 'static,
    {
        let operation = AsyncOperation::pending(label, self.state.reporter.clone());
        let handle = operation.clone();
        let future: BoxFuture<'static, ()> = Box::pin(async move {
            handle.mark_running();
            let outcome = work.await;
            handle.complete(outcome);
        });

        let task = Arc::new(ForegroundTask {
            future: Mutex::new(Some(future)),
            sender: self.state.sender.clone(),
        });
        self.send(ForegroundJob::Poll(task))?;
        Ok(operation)
    }

    /// Ask the lane to stop after the work already queued
    pub fn shutdown(&self) {
        if self.send(ForegroundJob::Shutdown).is_ok() {
            info!(lane = %self.state.name, "Foreground lane shutdown requested");
        }
    }

    fn send(&self, job: ForegroundJob) -> Result<()> {
        self.state
            .sender
            .send(job)
            .map_err(|_| OrchestrationError::ForegroundUnavailable(self.state.name.clone()))
    }
}

/// Keeps the foreground marked occupied; restores the previous flag on release
#[must_use = "the lane is released as soon as the guard is dropped"]
pub struct OccupancyGuard {
    state: Arc<ForegroundState>,
    previously: bool,
}

impl OccupancyGuard {
    pub fn release(self) {}
}

impl Drop for OccupancyGuard {
    fn drop(&mut self) {
        self.state.occupied.store(self.previously, Ordering::Release);
        debug!(lane = %self.state.name, "Foreground released");
    }
}

struct ForegroundTask {
    future: Mutex<Option<BoxFuture<'static, ()>>>,
    sender: Sender<ForegroundJob>,
}

impl ForegroundTask {
    fn poll_once(self: &Arc<Self>) {
        let mut slot = self.future.lock();
        if let Some(mut future) = slot.take() {
            let waker = waker_ref(self);
            let mut cx = Context::from_waker(&waker);
            if future.as_mut().poll(&mut cx).is_pending() {
                *slot = Some(future);
            }
        }
    }
}

impl ArcWake for ForegroundTask {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        if arc_self
            .sender
            .send(ForegroundJob::Poll(Arc::clone(arc_self)))
            .is_err()
        {
            warn!("Foreground lane gone; dropping wake-up");
        }
    }
}

fn pump(state: Weak<ForegroundState>, receiver: Receiver<ForegroundJob>) {
    CURRENT.with(|current| *current.borrow_mut() = Some(state));

    while let Ok(job) = receiver.recv() {
        let outcome = match job {
            ForegroundJob::Run(continuation) => panic::catch_unwind(AssertUnwindSafe(continuation)),
            ForegroundJob::Poll(task) => panic::catch_unwind(AssertUnwindSafe(|| task.poll_once())),
            ForegroundJob::Shutdown => break,
        };
        if outcome.is_err() {
            error!("Foreground continuation panicked; lane keeps pumping");
        }
    }

    CURRENT.with(|current| current.borrow_mut().take());
    info!("Foreground lane stopped");
}
