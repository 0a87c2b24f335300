//! # Async Orchestration Demo CLI
//!
//! Plays the part of the UI: fires one trigger onto the foreground lane and
//! prints what the handler renders. The deadlock pattern is given a bounded
//! wait, after which the lane state is reported instead of a result.

use anyhow::Context;
use async_orchestration::config::ConfigManager;
use async_orchestration::logging::init_structured_logging;
use async_orchestration::orchestration::{Orchestrator, Trigger};
use clap::Parser;
use crossbeam::channel::RecvTimeoutError;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Parser)]
#[command(name = "async-demo")]
#[command(about = "Run one asynchronous orchestration pattern and print its output")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Pattern to run: start, sequential, synchronous, deadlock, deadlock-free, join-all, fire-and-forget
    pattern: Trigger,

    /// Configuration directory (default: config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Environment overlay to load (default: ASYNC_DEMO_ENV, APP_ENV or development)
    #[arg(short, long)]
    environment: Option<String>,

    /// How long to wait before declaring the handler stuck, in milliseconds
    #[arg(long)]
    probe_ms: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_structured_logging();

    let environment = cli
        .environment
        .unwrap_or_else(ConfigManager::detect_environment);
    let manager = ConfigManager::load_from_directory_with_env(cli.config_dir, &environment)
        .context("loading configuration")?;
    let orchestrator = Orchestrator::from_manager(&manager)?;

    let probe = cli
        .probe_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| manager.config().runtime.deadlock_probe());

    info!(
        pattern = %cli.pattern,
        environment = %manager.environment(),
        config_directory = %manager.config_directory().display(),
        "Firing trigger"
    );
    let started = Instant::now();
    let fired = orchestrator.fire(cli.pattern)?;

    match fired.recv_timeout(probe) {
        Ok(text) => {
            println!("{text}");
            println!("({} ms)", started.elapsed().as_millis());
        }
        Err(RecvTimeoutError::Timeout) => {
            let lane = orchestrator.foreground();
            println!(
                "[{}] did not return within {} ms: foreground occupied = {}, continuations queued = {}",
                cli.pattern,
                probe.as_millis(),
                lane.is_occupied(),
                lane.pending_continuations()
            );
            println!("{}", fired.narrative().render());
        }
        Err(RecvTimeoutError::Disconnected) => {
            anyhow::bail!("handler for '{}' was dropped before rendering", cli.pattern);
        }
    }

    if cli.pattern == Trigger::FireAndForget {
        // Give the detached operation time to fail before reading the reporter
        std::thread::sleep(manager.config().tasks.failing_delay() + Duration::from_millis(100));
        for report in orchestrator.reporter().unobserved() {
            println!(
                "[Unobserved] {}: {} (detached: {})",
                report.operation, report.message, report.detached
            );
        }
    }

    orchestrator.shutdown();
    Ok(())
}
