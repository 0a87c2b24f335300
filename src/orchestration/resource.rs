//! The opaque "fetch a resource" operation.
//!
//! No transport is implemented; [`SimulatedFetcher`] waits out a configured
//! latency on the worker pool and returns a body of a configured length.

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::config::ResourceConfig;

/// Source of resource bodies
#[async_trait]
pub trait ResourceFetcher: Send + Sync + std::fmt::Debug {
    /// Fetch the body behind `url`
    async fn fetch(&self, url: &str) -> anyhow::Result<String>;
}

/// Fetcher that simulates latency and returns a fixed-length body
#[derive(Debug, Clone)]
pub struct SimulatedFetcher {
    latency: Duration,
    content_length: usize,
}

impl SimulatedFetcher {
    pub fn new(latency: Duration, content_length: usize) -> Self {
        Self {
            latency,
            content_length,
        }
    }

    pub fn from_config(config: &ResourceConfig) -> Self {
        Self::new(config.latency(), config.content_length)
    }
}

#[async_trait]
impl ResourceFetcher for SimulatedFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<String> {
        debug!(url = %url, latency_ms = self.latency.as_millis() as u64, "Simulated fetch started");
        tokio::time::sleep(self.latency).await;
        Ok(".".repeat(self.content_length))
    }
}

/// Fetcher whose every request fails; used to exercise failure propagation
#[derive(Debug, Clone)]
pub struct FailingFetcher {
    message: String,
}

impl FailingFetcher {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
impl ResourceFetcher for FailingFetcher {
    async fn fetch(&self, url: &str) -> anyhow::Result<String> {
        anyhow::bail!("{} ({url})", self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_fetch_returns_configured_length() {
        let fetcher = SimulatedFetcher::new(Duration::from_millis(5), 41_564);
        let body = fetcher.fetch("http://msdn.microsoft.com").await.unwrap();
        assert_eq!(body.len(), 41_564);
    }

    #[tokio::test]
    async fn test_failing_fetch_reports_url() {
        let fetcher = FailingFetcher::new("connection refused");
        let err = fetcher.fetch("http://example.invalid").await.unwrap_err();
        assert_eq!(err.to_string(), "connection refused (http://example.invalid)");
    }
}
