/// sqlframe Error Module
///
/// This module defines the error type shared by the query wrappers, the
/// statement generators and the connection adapters.
use thiserror::Error;

/// Comprehensive error type for sqlframe.
///
/// The variants separate the failure classes the query layer reacts to
/// differently:
/// - Driver failures (`Database`) propagate unchanged
/// - Transient connection-level failures (`Operational`) may be retried once
/// - Write policy violations and unsupported dialects are user errors
#[derive(Error, Debug)]
pub enum SqlFrameError {
    /// Database-related errors from SQLite operations
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Transient or connection-level failure (stale connection, locked
    /// database, statement without a result set)
    #[error("Operational error: {0}")]
    Operational(String),

    /// Table already exists and the write policy is `fail`
    #[error("Table '{0}' already exists.")]
    TableExists(String),

    /// Table is absent and the write policy is `append`
    #[error("Table '{0}' does not exist. Cannot append.")]
    TableMissing(String),

    /// Dialect or feature without an implementation
    #[error("Not implemented: {0}")]
    NotImplemented(String),

    /// Malformed tabular data (ragged columns, unknown index column)
    #[error("Frame error: {0}")]
    Frame(String),

    /// Configuration loading and validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SqlFrameError {
    /// Whether this error belongs to the operational class.
    ///
    /// The result fetcher downgrades operational fetch failures to an empty
    /// result, and the query wrappers retry once when a commit fails this way.
    pub fn is_operational(&self) -> bool {
        matches!(self, SqlFrameError::Operational(_))
    }
}

/// Type alias for Result to use SqlFrameError as the error type.
pub type Result<T> = std::result::Result<T, SqlFrameError>;
