//! Error types for the simulation driver.

use thiserror::Error;

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced to callers of the driver.
#[derive(Debug, Error)]
pub enum Error {
    /// The engine could not be constructed or failed before its first idle.
    #[error("engine construction failed: {0}")]
    Construction(String),

    /// The run's output could not be decoded.
    #[error("run output could not be decoded: {0}")]
    Decode(#[from] spicelink_raw::Error),

    /// The engine finished a run without writing its output file.
    #[error("engine wrote no output file at {0}")]
    MissingOutput(String),

    /// The engine stopped while a request was pending.
    #[error("engine stopped")]
    EngineStopped,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
