//! Error types for spicelink-raw.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for decoding and snapshot operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while decoding or comparing results.
#[derive(Debug, Error)]
pub enum Error {
    /// A mandatory rawfile header field is absent or unparsable.
    #[error("malformed rawfile: {0}")]
    MalformedOutput(String),

    /// A result disagrees structurally with its reference.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Snapshot file not found.
    #[error("snapshot not found: {path}")]
    SnapshotNotFound { path: PathBuf },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedOutput(message.into())
    }
}
