//! Session error types
//!
//! Defines all errors that can occur when writing or reading sessions.

use thiserror::Error;

/// Errors that can occur in the session layer
#[derive(Error, Debug)]
pub enum SessionError {
    /// Operation not valid in the current lifecycle state
    /// (e.g. writing samples before the catalog is committed)
    #[error("Invalid state: {0}")]
    State(String),

    /// Catalog definition is invalid (duplicate identifier, missing
    /// channel, empty lookup table, etc.)
    #[error("Schema error: {0}")]
    Schema(String),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Data corruption detected (checksum mismatch, invalid magic,
    /// truncated file, unclosed session)
    #[error("Corrupt session: {0}")]
    Corruption(String),

    /// Query referenced an unknown parameter/channel or an invalid window
    #[error("Query error: {0}")]
    Query(String),

    /// Caller-supplied values are inconsistent (mismatched array lengths,
    /// payload size not matching the sample count, backwards timestamps)
    #[error("Invalid argument: {0}")]
    Argument(String),
}

impl From<bincode::Error> for SessionError {
    fn from(err: bincode::Error) -> Self {
        SessionError::Corruption(format!("catalog encoding: {}", err))
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        SessionError::Corruption(format!("detail log encoding: {}", err))
    }
}

/// Result type alias for session operations
pub type SessionResult<T> = Result<T, SessionError>;
