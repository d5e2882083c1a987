//! Error types for the Gemini voice skill.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while serving a voice request.
#[derive(Error, Debug)]
pub enum Error {
    /// Request signature or certificate chain rejected
    #[error("Verification failed: {0}")]
    Verification(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Transport-level failure talking to a remote endpoint
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Remote endpoint answered with a non-success status
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Remote payload did not have the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get HTTP status code for this error.
    ///
    /// Only verification failures are surfaced to the voice platform as a
    /// non-200 status; everything else is turned into a spoken reply.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Verification(_) => 400,
            _ => 500,
        }
    }
}
