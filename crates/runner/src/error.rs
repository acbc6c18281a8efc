//! Error types for drone-runner

use std::path::PathBuf;
use thiserror::Error;

use drone_core::TaskId;

/// Result type alias for runner operations
pub type Result<T> = std::result::Result<T, DroneError>;

/// Errors that can occur while acquiring, executing and reporting tasks.
///
/// Apart from `Startup` and `Aborted`, every variant only abandons the current iteration;
/// the loops carry on with the next poll.
#[derive(Debug, Error)]
pub enum DroneError {
    /// RPC to the task tracker failed
    #[error("Task tracker request failed: {0}")]
    Transport(#[source] drone_core::Error),

    /// First checkout of a project failed
    #[error("Failed to deploy project {project}: {source}")]
    Deployment {
        project: String,
        #[source]
        source: git_checkout::CheckoutError,
    },

    /// Reconciling an existing checkout failed
    #[error("Failed to update project {project} to {version}: {source}")]
    Update {
        project: String,
        version: String,
        #[source]
        source: git_checkout::CheckoutError,
    },

    /// The checkout has no entry point to run
    #[error("Entry point not found: {path}")]
    MissingEntryPoint { path: PathBuf },

    /// Forwarding task output or releasing the task failed
    #[error("Failed to report task {task_id}: {source}")]
    Reporting {
        task_id: TaskId,
        #[source]
        source: drone_core::Error,
    },

    /// The agent could not start
    #[error("Startup failed: {message}")]
    Startup {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A background loop stopped
    #[error("{task} loop stopped: {message}")]
    Aborted { task: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DroneError {
    /// Create a Startup error
    pub fn startup(message: impl Into<String>) -> Self {
        Self::Startup {
            message: message.into(),
            source: None,
        }
    }

    /// Create a Startup error with source
    pub fn startup_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Startup {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether the loops should simply retry on the next cycle
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Startup { .. } | Self::Aborted { .. })
    }
}
