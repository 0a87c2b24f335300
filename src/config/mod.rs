//! # Demo Configuration
//!
//! Durations, labels and runtime sizing for the orchestration demo. Defaults
//! reproduce the classic scenario (Task1 takes 5s, Task2 takes 3s, the failing
//! operation throws after 2s); files and environment variables layered on top
//! by [`ConfigManager`] can shrink them.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use async_orchestration::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let first = manager.config().tasks.first_duration();
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::defaults;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct DemoConfig {
    /// The two uppercase tasks and the failing operation
    pub tasks: TasksConfig,

    /// The opaque "fetch a resource and measure it" operation
    pub resource: ResourceConfig,

    /// Worker pool and foreground lane settings
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TasksConfig {
    pub first_label: String,
    pub first_duration_ms: u64,
    pub second_label: String,
    pub second_duration_ms: u64,
    pub failing_label: String,
    /// Label of the failing operation issued and then abandoned
    pub fire_and_forget_label: String,
    pub failing_delay_ms: u64,
    pub failure_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ResourceConfig {
    pub url: String,
    pub latency_ms: u64,
    /// Length of the simulated body returned by the fetch
    pub content_length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RuntimeConfig {
    pub worker_threads: usize,
    pub worker_thread_name: String,
    pub foreground_thread_name: String,
    /// How long an outside observer waits before declaring a trigger stuck
    pub deadlock_probe_ms: u64,
}

impl TasksConfig {
    pub fn first_duration(&self) -> Duration {
        Duration::from_millis(self.first_duration_ms)
    }

    pub fn second_duration(&self) -> Duration {
        Duration::from_millis(self.second_duration_ms)
    }

    pub fn failing_delay(&self) -> Duration {
        Duration::from_millis(self.failing_delay_ms)
    }
}

impl ResourceConfig {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }
}

impl RuntimeConfig {
    pub fn deadlock_probe(&self) -> Duration {
        Duration::from_millis(self.deadlock_probe_ms)
    }

    /// Small pool for unit tests
    pub fn for_testing() -> Self {
        Self {
            worker_threads: 2,
            ..Self::default()
        }
    }
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            first_label: defaults::FIRST_TASK_LABEL.to_string(),
            first_duration_ms: 5_000,
            second_label: defaults::SECOND_TASK_LABEL.to_string(),
            second_duration_ms: 3_000,
            failing_label: defaults::FAILING_TASK_LABEL.to_string(),
            fire_and_forget_label: defaults::FIRE_AND_FORGET_LABEL.to_string(),
            failing_delay_ms: 2_000,
            failure_message: defaults::FAILURE_MESSAGE.to_string(),
        }
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            url: defaults::RESOURCE_URL.to_string(),
            latency_ms: 1_500,
            content_length: 41_564,
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            worker_threads: 4,
            worker_thread_name: defaults::WORKER_THREAD_NAME.to_string(),
            foreground_thread_name: defaults::FOREGROUND_THREAD_NAME.to_string(),
            deadlock_probe_ms: 10_000,
        }
    }
}

impl DemoConfig {
    /// Millisecond-scale durations that keep the timing relationships intact
    pub fn for_testing() -> Self {
        Self {
            tasks: TasksConfig {
                first_duration_ms: 300,
                second_duration_ms: 200,
                failing_delay_ms: 100,
                ..TasksConfig::default()
            },
            resource: ResourceConfig {
                latency_ms: 100,
                content_length: 1_024,
                ..ResourceConfig::default()
            },
            runtime: RuntimeConfig {
                deadlock_probe_ms: 600,
                ..RuntimeConfig::for_testing()
            },
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.runtime.worker_threads == 0 {
            return Err(ConfigurationError::invalid(
                "runtime.worker_threads",
                "at least one worker thread is required",
            ));
        }

        let labels = [
            ("tasks.first_label", &self.tasks.first_label),
            ("tasks.second_label", &self.tasks.second_label),
            ("tasks.failing_label", &self.tasks.failing_label),
            (
                "tasks.fire_and_forget_label",
                &self.tasks.fire_and_forget_label,
            ),
            ("resource.url", &self.resource.url),
            ("runtime.worker_thread_name", &self.runtime.worker_thread_name),
            (
                "runtime.foreground_thread_name",
                &self.runtime.foreground_thread_name,
            ),
        ];
        for (field, value) in labels {
            if value.trim().is_empty() {
                return Err(ConfigurationError::invalid(field, "must not be empty"));
            }
        }

        if self.runtime.worker_thread_name == self.runtime.foreground_thread_name {
            return Err(ConfigurationError::invalid(
                "runtime.foreground_thread_name",
                "must differ from the worker thread name",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DemoConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tasks.first_duration(), Duration::from_secs(5));
        assert_eq!(config.tasks.second_duration(), Duration::from_secs(3));
        assert_eq!(config.tasks.failing_delay(), Duration::from_secs(2));
    }

    #[test]
    fn test_testing_profile_keeps_task_ordering() {
        let config = DemoConfig::for_testing();
        assert!(config.validate().is_ok());
        assert!(config.tasks.first_duration() > config.tasks.second_duration());
        assert!(config.runtime.deadlock_probe() > config.resource.latency());
    }

    #[test]
    fn test_zero_workers_rejected() {
        let mut config = DemoConfig::default();
        config.runtime.worker_threads = 0;

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("runtime.worker_threads"));
    }

    #[test]
    fn test_empty_label_rejected() {
        let mut config = DemoConfig::default();
        config.tasks.second_label = "  ".to_string();

        match config.validate().unwrap_err() {
            ConfigurationError::Invalid { field, .. } => assert_eq!(field, "tasks.second_label"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
