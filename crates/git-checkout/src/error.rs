//! Error types for git-checkout operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for checkout operations
pub type Result<T> = std::result::Result<T, CheckoutError>;

/// Errors that can occur during checkout operations
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Git command execution failed
    #[error("Git command failed: {message}")]
    GitCommandFailed {
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// Not a git repository
    #[error("Not a git repository: {path}")]
    NotARepository { path: PathBuf },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CheckoutError {
    /// Create a GitCommandFailed error
    pub fn git_failed(message: impl Into<String>) -> Self {
        Self::GitCommandFailed {
            message: message.into(),
            source: None,
        }
    }

    /// Create a GitCommandFailed error with source
    pub fn git_failed_with_source(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::GitCommandFailed {
            message: message.into(),
            source: Some(source),
        }
    }
}
