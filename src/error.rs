//! Error types for the Ariadne onboarding system
//!
//! Structured error definitions via thiserror; anyhow is reserved for the
//! binary boundary.

use thiserror::Error;

/// Main error type for Ariadne operations
#[derive(Error, Debug)]
pub enum AriadneError {
    /// Storage backend operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// AI provider request failed
    #[error("Provider error: {0}")]
    Provider(String),

    /// No ingested code index is available for the repo
    #[error("No code index found for {0}")]
    NoCodeIndex(String),

    /// Client supplied an invalid or incomplete progress event
    #[error("Invalid event: {0}")]
    InvalidEvent(String),

    /// Requested record or artifact does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Ariadne operations
pub type Result<T> = std::result::Result<T, AriadneError>;

impl AriadneError {
    /// Whether this error class is the caller's fault (never retried,
    /// surfaced as a client error at the HTTP boundary)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AriadneError::NoCodeIndex(_) | AriadneError::InvalidEvent(_)
        )
    }
}
