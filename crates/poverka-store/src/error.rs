//! Error types for poverka-store.

use std::path::PathBuf;

/// Result type for poverka-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in poverka-store.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Task not found in database.
    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    /// No verification record for a device number.
    #[error("No verification record for device {0}")]
    DeviceNotFound(String),

    /// Invalid timestamp.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(i64),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV export error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
