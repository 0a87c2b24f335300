//! # System Constants
//!
//! Labels, environment variable names and log event names shared across the
//! orchestration demo.

/// Default labels and names used when no configuration overrides them
pub mod defaults {
    pub const FIRST_TASK_LABEL: &str = "Task1";
    pub const SECOND_TASK_LABEL: &str = "Task2";
    pub const FAILING_TASK_LABEL: &str = "DoAsyncTaskWithError";
    pub const FIRE_AND_FORGET_LABEL: &str = "DoAsyncVoidWithError";
    pub const FAILURE_MESSAGE: &str = "I'm sorry!";
    pub const RESOURCE_URL: &str = "http://msdn.microsoft.com";
    pub const WORKER_THREAD_NAME: &str = "async-demo-worker";
    pub const FOREGROUND_THREAD_NAME: &str = "foreground";
}

/// Environment and file naming
pub mod system {
    pub const ENVIRONMENT_VAR: &str = "ASYNC_DEMO_ENV";
    pub const CONFIG_DIR_VAR: &str = "ASYNC_DEMO_CONFIG_DIR";
    pub const LOG_FORMAT_VAR: &str = "ASYNC_DEMO_LOG_FORMAT";
    pub const ENV_PREFIX: &str = "ASYNC_DEMO";
    pub const CONFIG_FILE_STEM: &str = "async_demo";
    pub const DEFAULT_ENVIRONMENT: &str = "development";
    pub const TEST_ENVIRONMENT: &str = "test";
}

/// Names of structured log events emitted at trigger boundaries
pub mod events {
    pub const TRIGGER_STARTED: &str = "trigger.started";
    pub const TRIGGER_COMPLETED: &str = "trigger.completed";
    pub const OPERATION_OBSERVED: &str = "operation.observed";
}
