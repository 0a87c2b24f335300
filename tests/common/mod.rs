//! Shared helpers for integration tests.
#![allow(dead_code)]

use async_orchestration::config::DemoConfig;
use async_orchestration::logging::init_structured_logging;
use async_orchestration::orchestration::{Orchestrator, Trigger};
use std::time::{Duration, Instant};

/// Orchestrator with millisecond-scale durations
pub fn test_orchestrator() -> Orchestrator {
    init_structured_logging();
    Orchestrator::new(DemoConfig::for_testing()).expect("testing configuration is valid")
}

/// Orchestrator built from a tweaked testing configuration
pub fn orchestrator_with(tweak: impl FnOnce(&mut DemoConfig)) -> Orchestrator {
    init_structured_logging();
    let mut config = DemoConfig::for_testing();
    tweak(&mut config);
    Orchestrator::new(config).expect("tweaked configuration is valid")
}

/// Generous upper bound for anything that is expected to finish
pub fn completion_bound(config: &DemoConfig) -> Duration {
    let tasks = &config.tasks;
    (tasks.first_duration() + tasks.second_duration() + config.resource.latency()) * 4
}

/// Fire a trigger on the foreground lane and wait for its rendered text
pub fn fire_and_wait(orchestrator: &Orchestrator, trigger: Trigger) -> (String, Duration) {
    let started = Instant::now();
    let fired = orchestrator.fire(trigger).expect("foreground accepts handlers");
    let rendered = fired
        .recv_timeout(completion_bound(orchestrator.config()))
        .unwrap_or_else(|_| panic!("trigger {trigger} did not complete"));
    (rendered, started.elapsed())
}

/// Poll `condition` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}
