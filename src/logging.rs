//! # Structured Logging Module
//!
//! Environment-aware structured logging for following operations across the
//! foreground lane and the worker pool. Console output by default; set
//! `ASYNC_DEMO_LOG_FORMAT=json` for one JSON object per line.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::constants::{events, system};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
///
/// Safe to call more than once; only the first call installs a subscriber, and
/// an already-installed global subscriber is left alone.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let json = std::env::var(system::LOG_FORMAT_VAR)
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let layer = if json {
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .json()
                .with_filter(build_filter(&environment))
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_names(true)
                .with_level(true)
                .with_filter(build_filter(&environment))
                .boxed()
        };

        if tracing_subscriber::registry().with(layer).try_init().is_err() {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
            return;
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            json,
            "Structured logging initialized"
        );
    });
}

fn build_filter(environment: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(get_log_level(environment)))
}

fn get_environment() -> String {
    std::env::var(system::ENVIRONMENT_VAR)
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| system::DEFAULT_ENVIRONMENT.to_string())
}

/// Default filter directive for an environment when `RUST_LOG` is unset
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

/// Log structured data for an operation lifecycle point
pub fn log_operation(operation: &str, status: &str, elapsed_ms: Option<u64>, details: Option<&str>) {
    tracing::info!(
        event = events::OPERATION_OBSERVED,
        operation = %operation,
        status = %status,
        elapsed_ms = elapsed_ms,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "OPERATION"
    );
}

/// Log structured data when a trigger starts or renders its result
pub fn log_trigger(trigger: &str, event: &str, elapsed_ms: Option<u64>, rendered: Option<&str>) {
    tracing::info!(
        event = %event,
        trigger = %trigger,
        elapsed_ms = elapsed_ms,
        rendered = rendered,
        timestamp = %Utc::now().to_rfc3339(),
        "TRIGGER"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_levels_by_environment() {
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("test"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_structured_logging();
        init_structured_logging();
        log_trigger("sequential", events::TRIGGER_STARTED, None, None);
        log_operation("Task1", "completed", Some(5), Some("TASK1"));
    }
}
