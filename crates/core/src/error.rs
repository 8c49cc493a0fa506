//! Unified error types for retroshelf.
//!
//! The server maps each variant onto an HTTP status; the upper-case prefix of
//! the display text doubles as a stable error code in logs.

use std::time::Duration;

/// Unified error type for the asset cache and mutation pipelines.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Missing or malformed request parameters.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Another operation holds the lock for this key.
    #[error("BUSY: {0}")]
    Busy(String),

    /// The bulk sync cooldown has not elapsed yet.
    #[error(
        "THROTTLED: core sync cooldown active, {} remaining",
        format_remaining(.remaining)
    )]
    ThrottleActive { remaining: Duration },

    /// A source file does not exist.
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Filesystem operation failed.
    #[error("IO_ERROR: {0}")]
    Io(#[from] std::io::Error),

    /// Reading or writing a zip archive failed.
    #[error("ARCHIVE_ERROR: {0}")]
    Archive(String),

    /// Outbound download failed.
    #[error("DOWNLOAD_FAILED: {0}")]
    Download(String),

    /// A persisted JSON side-file could not be encoded or decoded.
    #[error("STORE_ERROR: {0}")]
    Store(String),

    /// A background task panicked or was cancelled.
    #[error("TASK_FAILED: {0}")]
    Task(String),
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Error::Io(e),
            other => Error::Archive(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Store(err.to_string())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Task(err.to_string())
    }
}

/// Render a cooldown remainder as `"<h>h <m>m"`.
pub fn format_remaining(remaining: &Duration) -> String {
    let secs = remaining.as_secs();
    format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
}
