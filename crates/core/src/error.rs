//! Error types for the core library

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// The request never produced a usable HTTP response
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The tracker answered with a non-success HTTP status
    #[error("Tracker returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The tracker answered `ok=false`
    #[error("Rejected by tracker: {0}")]
    Rejected(String),

    /// The response envelope was ok but carried no payload
    #[error("Missing content in tracker response: {0}")]
    MissingContent(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}
