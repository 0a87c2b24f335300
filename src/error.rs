use crate::config::ConfigurationError;

/// Crate-level error for everything that is not the outcome of an operation itself
#[derive(Debug, thiserror::Error)]
pub enum OrchestrationError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// The foreground lane has shut down and its queue no longer accepts work
    #[error("Foreground context '{0}' is no longer accepting work")]
    ForegroundUnavailable(String),

    #[error("Runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, OrchestrationError>;
