//! Error types for ApRES client operations

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Result type alias for ApRES client operations
pub type Result<T> = std::result::Result<T, ApresError>;

/// Errors that can occur while talking to an ApRES device
#[derive(Error, Debug)]
pub enum ApresError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid client settings
    #[error("Invalid settings: {0}")]
    Settings(String),

    /// API key missing or rejected (device error code 401)
    #[error("Unauthorized or API key invalid: {0}")]
    InvalidCredentials(String),

    /// Device reported 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// Radar or VAB failure (device error code 500)
    #[error("Device internal error: {0}")]
    DeviceInternalError(String),

    /// Radar busy or unavailable (device error code 503, or 403 on burst start)
    #[error("Device busy: {0}")]
    DeviceBusy(String),

    /// Response lacked an expected key or carried an invalid value
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Status code the operation does not expect
    #[error("Unexpected status {status}: {message}")]
    UnexpectedStatus { status: u16, message: String },

    /// Burst start was refused
    #[error("Burst not started: {0}")]
    BurstNotStarted(String),

    /// Results reported `idle` while a burst was expected
    #[error("No chirp started")]
    NoChirpStarted,

    /// Burst did not finish before the results deadline
    #[error("Timed out waiting for burst results after {0:?}")]
    ResultsTimeout(Duration),

    /// Rejected argument shape or value
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Attenuator key outside the configured attenuator range
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Device persisted a different value than requested
    #[error("Update not applied: {field} requested {requested}, device reports {actual}")]
    UpdateNotApplied {
        field: String,
        requested: String,
        actual: String,
    },

    /// Upload request carried no file part
    #[error("No file uploaded: {0}")]
    NoFileUploaded(String),

    /// Download target exists and overwriting was not requested
    #[error("File already exists: {}", .0.display())]
    FileExists(PathBuf),

    /// Background results polling was cancelled
    #[error("Results polling cancelled")]
    Cancelled,
}

impl ApresError {
    /// Create an unexpected-status error from a status code and message
    pub fn unexpected_status(status: u16, message: impl Into<String>) -> Self {
        Self::UnexpectedStatus {
            status,
            message: message.into(),
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }
}
