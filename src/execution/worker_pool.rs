//! Worker pool backing operation work and context-free continuations.

use std::future::Future;
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, info};

use crate::config::RuntimeConfig;
use crate::error::{OrchestrationError, Result};
use crate::failure::{FailureReporter, OperationFailure};
use crate::operation::AsyncOperation;

/// Multi-threaded tokio runtime that runs the body of every started operation
///
/// Cheap to clone; the runtime is shut down in the background when the last
/// handle goes away so a stuck foreground lane never blocks process exit.
#[derive(Clone)]
pub struct WorkerPool {
    inner: Arc<WorkerPoolInner>,
}

struct WorkerPoolInner {
    runtime: Option<Runtime>,
    handle: Handle,
    reporter: FailureReporter,
    worker_threads: usize,
}

impl Drop for WorkerPoolInner {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
            debug!("Worker pool runtime shut down");
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("worker_threads", &self.inner.worker_threads)
            .finish()
    }
}

impl WorkerPool {
    /// Build the pool from runtime configuration
    pub fn new(config: &RuntimeConfig, reporter: FailureReporter) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(config.worker_threads)
            .thread_name(config.worker_thread_name.clone())
            .enable_all()
            .build()
            .map_err(|e| OrchestrationError::Runtime(format!("failed to build worker pool: {e}")))?;

        info!(
            worker_threads = config.worker_threads,
            "Worker pool started"
        );

        Ok(Self {
            inner: Arc::new(WorkerPoolInner {
                handle: runtime.handle().clone(),
                runtime: Some(runtime),
                reporter,
                worker_threads: config.worker_threads,
            }),
        })
    }

    /// Begin `work` immediately on a worker and return its handle in the running state
    pub fn start<T, Fut>(&self, label: impl Into<String>, work: Fut) -> AsyncOperation<T>
    where
        T: Clone + Send + 'static,
        Fut: Future<Output = std::result::Result<T, OperationFailure>> + Send + 'static,
    {
        let operation = AsyncOperation::pending(label, self.inner.reporter.clone());
        operation.mark_running();

        let handle = operation.clone();
        self.inner.handle.spawn(async move {
            let outcome = work.await;
            handle.complete(outcome);
        });

        operation
    }

    pub fn handle(&self) -> &Handle {
        &self.inner.handle
    }

    pub fn reporter(&self) -> &FailureReporter {
        &self.inner.reporter
    }

    pub fn worker_threads(&self) -> usize {
        self.inner.worker_threads
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::OperationStatus;
    use std::time::Duration;

    fn pool() -> WorkerPool {
        WorkerPool::new(&RuntimeConfig::for_testing(), FailureReporter::new()).unwrap()
    }

    #[test]
    fn test_start_is_eager_and_running() {
        let pool = pool();
        let (tx, rx) = crossbeam::channel::bounded(1);

        let operation = pool.start("eager", async move {
            let _ = tx.send(());
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok::<_, OperationFailure>("done".to_string())
        });

        assert_eq!(operation.status(), OperationStatus::Running);
        // Work began without anyone awaiting the handle
        rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(operation.blocking_wait().unwrap(), "done");
        assert_eq!(operation.status(), OperationStatus::Completed);
    }

    #[test]
    fn test_work_runs_on_worker_threads() {
        let pool = pool();
        let operation = pool.start("where", async {
            Ok::<_, OperationFailure>(std::thread::current().name().map(String::from))
        });

        let name = operation.blocking_wait().unwrap();
        assert_eq!(name.as_deref(), Some(RuntimeConfig::for_testing().worker_thread_name.as_str()));
    }
}
