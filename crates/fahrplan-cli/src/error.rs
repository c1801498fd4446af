//! Client error types.

use fahrplan_core::TracingError;
use fahrplan_providers::SourceError;
use fahrplan_server::ServerError;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("logging setup failed: {0}")]
    Tracing(#[from] TracingError),

    /// A requested session id is not in the schedule.
    #[error("not found: {0}")]
    NotFound(String),
}

impl ClientError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
