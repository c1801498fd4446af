//! Server error types.

use fahrplan_providers::SourceError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

#[derive(Debug, Error)]
pub enum ServerError {
    /// Fetching or decoding the schedule failed.
    #[error("schedule refresh failed: {0}")]
    Source(#[from] SourceError),

    #[error("configuration error: {message}")]
    Config { message: String },

    /// The refresh loop is gone.
    #[error("refresh loop has shut down")]
    Shutdown,
}

impl ServerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns true if the next refresh may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Source(e) => e.is_retryable(),
            Self::Config { .. } | Self::Shutdown => false,
        }
    }
}
