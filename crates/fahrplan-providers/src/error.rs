//! Error types for schedule sources.
//!
//! Transport failures and undecodable documents share [`SourceError`] so the
//! refresh logic can treat every failed fetch the same way: keep the current
//! schedule and try again later.

use std::fmt;

use fahrplan_core::DecodeError;
use thiserror::Error;

/// The category of a source error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceErrorCode {
    /// Connection failed, timed out, or the body could not be read.
    NetworkError,
    /// The server answered with a non-success status.
    HttpStatus,
    /// The server answered with something that is not a document.
    InvalidResponse,
    /// The document was received but could not be decoded.
    DecodeError,
    /// The source is misconfigured (bad URL template, missing path).
    ConfigurationError,
    /// Local file access failed.
    Io,
}

impl SourceErrorCode {
    /// Returns true if trying again later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkError | Self::HttpStatus | Self::InvalidResponse | Self::DecodeError
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "network_error",
            Self::HttpStatus => "http_status",
            Self::InvalidResponse => "invalid_response",
            Self::DecodeError => "decode_error",
            Self::ConfigurationError => "configuration_error",
            Self::Io => "io_error",
        }
    }
}

impl fmt::Display for SourceErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A failed fetch.
#[derive(Debug, Error)]
pub struct SourceError {
    code: SourceErrorCode,
    message: String,
    /// Name of the source that failed ("http", "file").
    source_name: Option<String>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SourceError {
    pub fn new(code: SourceErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source_name: None,
            source: None,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::NetworkError, message)
    }

    pub fn http_status(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::HttpStatus, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::InvalidResponse, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::ConfigurationError, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(SourceErrorCode::Io, message)
    }

    /// Sets the name of the failing source.
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Attaches the underlying cause.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> SourceErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl From<DecodeError> for SourceError {
    fn from(err: DecodeError) -> Self {
        Self::new(SourceErrorCode::DecodeError, err.to_string()).with_source(err)
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref name) = self.source_name {
            write!(f, "[{}] ", name)?;
        }
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;
