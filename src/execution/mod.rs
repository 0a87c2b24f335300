//! Execution contexts: the single foreground lane and the worker pool.

pub mod foreground;
pub mod worker_pool;

pub use foreground::{ForegroundContext, OccupancyGuard};
pub use worker_pool::WorkerPool;
