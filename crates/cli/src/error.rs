//! Error types for CLI operations.

use thiserror::Error;

/// Simulation errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Simulation arguments out of range
    #[error("Invalid argument '{name}': {message}")]
    InvalidArgument { name: String, message: String },

    /// Transport could not be built from configuration
    #[error(transparent)]
    Dispatcher(#[from] dispatcher::DispatcherError),

    /// Metrics endpoint could not be installed
    #[error("Failed to start metrics endpoint: {0}")]
    Metrics(#[source] anyhow::Error),

    /// A producer or dispatcher task panicked or was cancelled
    #[error("Task '{task}' failed: {source}")]
    Task {
        task: String,
        #[source]
        source: tokio::task::JoinError,
    },
}

impl CliError {
    pub fn invalid_argument(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn task(task: impl Into<String>, source: tokio::task::JoinError) -> Self {
        Self::Task {
            task: task.into(),
            source,
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
