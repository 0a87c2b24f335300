//! # Join-All Combinator
//!
//! [`CompositeWait`] resolves once every member operation is terminal. There is
//! no short-circuit: a member failing early does not resolve the join, it only
//! becomes the join's aggregated failure if it was the first one observed.

use parking_lot::Mutex;
use std::future::IntoFuture;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::handle::{AsyncOperation, Awaiting, Outcome, ResumeOn};
use crate::failure::OperationFailure;
use crate::state_machine::OperationStatus;

/// Await-all join over a set of already-issued operations
#[must_use = "a join that is never awaited waits for nothing"]
#[derive(Debug)]
pub struct CompositeWait<T> {
    members: Vec<AsyncOperation<T>>,
    joined: AsyncOperation<()>,
}

impl<T: Clone + Send + 'static> CompositeWait<T> {
    /// Join `members`; they must already be started for the join to overlap them
    pub fn when_all(label: impl Into<String>, members: Vec<AsyncOperation<T>>) -> Self {
        let reporter = members
            .first()
            .map(|member| member.reporter().clone())
            .unwrap_or_default();
        let joined = AsyncOperation::pending(label, reporter);
        joined.mark_running();

        if members.is_empty() {
            joined.complete(Ok(()));
            return Self { members, joined };
        }

        let remaining = Arc::new(AtomicUsize::new(members.len()));
        let first_failure: Arc<Mutex<Option<OperationFailure>>> = Arc::new(Mutex::new(None));

        for member in &members {
            let remaining = Arc::clone(&remaining);
            let first_failure = Arc::clone(&first_failure);
            let joined = joined.clone();
            let member_label = member.label().to_string();

            member.on_terminal(ResumeOn::Worker, move |outcome| {
                if let Err(failure) = outcome {
                    first_failure.lock().get_or_insert(failure);
                }
                let left = remaining.fetch_sub(1, Ordering::AcqRel) - 1;
                debug!(member = %member_label, remaining = left, "Join member settled");

                if left == 0 {
                    let aggregated = first_failure.lock().clone();
                    joined.complete(match aggregated {
                        Some(failure) => Err(failure),
                        None => Ok(()),
                    });
                }
            });
        }

        Self { members, joined }
    }

    pub fn members(&self) -> &[AsyncOperation<T>] {
        &self.members
    }

    pub fn status(&self) -> OperationStatus {
        self.joined.status()
    }

    /// Block until all members are terminal; the first observed failure is returned
    pub fn wait(&self) -> Outcome<()> {
        self.joined.blocking_wait()
    }

    /// Every member failure, in member order, once the join has resolved
    pub fn failures(&self) -> Vec<OperationFailure> {
        self.members
            .iter()
            .filter_map(|member| match member.try_result() {
                Some(Err(failure)) => Some(failure),
                _ => None,
            })
            .collect()
    }

    /// Member outcomes in issue order; `None` for members still in flight
    pub fn results(&self) -> Vec<Option<Outcome<T>>> {
        self.members.iter().map(AsyncOperation::try_result).collect()
    }
}

impl<T: Clone + Send + 'static> IntoFuture for CompositeWait<T> {
    type Output = Outcome<()>;
    type IntoFuture = Awaiting<()>;

    fn into_future(self) -> Self::IntoFuture {
        self.joined.into_future()
    }
}

impl<T: Clone + Send + 'static> IntoFuture for &CompositeWait<T> {
    type Output = Outcome<()>;
    type IntoFuture = Awaiting<()>;

    fn into_future(self) -> Self::IntoFuture {
        (&self.joined).into_future()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeConfig;
    use crate::execution::WorkerPool;
    use crate::failure::FailureReporter;
    use std::time::{Duration, Instant};

    fn pool() -> WorkerPool {
        WorkerPool::new(&RuntimeConfig::for_testing(), FailureReporter::new()).unwrap()
    }

    fn delayed(pool: &WorkerPool, label: &str, ms: u64, fail: bool) -> AsyncOperation<String> {
        let label = label.to_string();
        pool.start(label.clone(), async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            if fail {
                Err(OperationFailure::msg(label, "I'm sorry!"))
            } else {
                Ok(label.to_uppercase())
            }
        })
    }

    #[test]
    fn test_join_waits_for_slowest_member() {
        let pool = pool();
        let started = Instant::now();
        let join = CompositeWait::when_all(
            "both",
            vec![delayed(&pool, "a", 120, false), delayed(&pool, "b", 60, false)],
        );

        join.wait().unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(120));
        assert!(elapsed < Duration::from_millis(180 + 150));
        let values: Vec<String> = join
            .results()
            .into_iter()
            .map(|r| r.unwrap().unwrap())
            .collect();
        assert_eq!(values, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_early_failure_does_not_short_circuit() {
        let pool = pool();
        let slow = delayed(&pool, "slow", 150, false);
        let join = CompositeWait::when_all(
            "mixed",
            vec![delayed(&pool, "fast", 10, true), slow.clone()],
        );

        let failure = join.wait().unwrap_err();

        assert_eq!(failure.operation(), "fast");
        // The join only resolved after the slow member settled too
        assert_eq!(slow.status(), OperationStatus::Completed);
        assert_eq!(join.failures().len(), 1);
        assert_eq!(join.members()[1].result().unwrap(), "SLOW");
    }

    #[test]
    fn test_every_member_failure_stays_inspectable() {
        let pool = pool();
        let join = CompositeWait::when_all(
            "all-fail",
            vec![delayed(&pool, "one", 20, true), delayed(&pool, "two", 40, true)],
        );

        let aggregated = join.wait().unwrap_err();
        let failures = join.failures();

        assert_eq!(failures.len(), 2);
        assert!(aggregated.is_same_failure(&failures[0]));
        assert_eq!(failures[1].operation(), "two");
    }

    #[test]
    fn test_empty_join_resolves_immediately() {
        let join = CompositeWait::<u8>::when_all("nothing", Vec::new());
        assert_eq!(join.status(), OperationStatus::Completed);
        assert!(join.wait().is_ok());
    }
}
