//! Error types for poverka-core.
//!
//! The calculation engine itself never fails: malformed numeric input is
//! coerced to defaults. Errors surface from the session editor (addressing a
//! point that does not exist), from input validation, and from the I/O around
//! protocols and notifications.

use std::path::PathBuf;

use thiserror::Error;

use crate::validation::ValidationErrors;

/// Errors that can occur in the verification workflow.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Measurement group index out of bounds.
    #[error("Measurement group {index} does not exist ({count} groups)")]
    GroupNotFound {
        /// Requested group index.
        index: usize,
        /// Number of groups in the session.
        count: usize,
    },

    /// Measurement point index out of bounds.
    #[error("Point {index} does not exist in group {group} ({count} points)")]
    PointNotFound {
        /// Group index.
        group: usize,
        /// Requested point index.
        index: usize,
        /// Number of points in the group.
        count: usize,
    },

    /// A session describes more points than a group may hold.
    #[error("Too many points: {count} (at most {max})")]
    TooManyPoints {
        /// Requested number of points.
        count: usize,
        /// Largest accepted number.
        max: usize,
    },

    /// No climate reading has been recorded today.
    #[error("Отсутствуют климатические данные за текущий день")]
    NoClimateData,

    /// Climate input rejected by the validator.
    #[error("Invalid climate input: {0}")]
    Validation(ValidationErrors),

    /// Session file could not be parsed.
    #[error("Invalid session file {path}: {source}")]
    InvalidSession {
        /// The session file.
        path: PathBuf,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A record field could not be parsed.
    #[error(transparent)]
    Parse(#[from] poverka_types::ParseError),

    /// A protocol section could not be laid out.
    #[error("{0}")]
    Layout(String),

    /// The PDF library failed to build the document.
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Reminder time of day is not a valid clock time.
    #[error("Invalid reminder time {hour:02}:{minute:02}")]
    InvalidSchedule {
        /// Configured hour.
        hour: u8,
        /// Configured minute.
        minute: u8,
    },

    /// The journal backing a reminder decision could not be read.
    #[error("Storage error: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A desktop notification could not be delivered.
    #[error("Notification failed: {0}")]
    Notification(String),
}

impl Error {
    /// Create a PDF error from any displayable library error.
    pub fn pdf(err: impl std::fmt::Display) -> Self {
        Error::Pdf(err.to_string())
    }

    /// Wrap an error from a storage backend, keeping it as the source.
    pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Error::Store(Box::new(err))
    }
}

/// Result type alias using poverka-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PointNotFound {
            group: 0,
            index: 7,
            count: 5,
        };
        assert_eq!(
            err.to_string(),
            "Point 7 does not exist in group 0 (5 points)"
        );
        assert_eq!(
            Error::NoClimateData.to_string(),
            "Отсутствуют климатические данные за текущий день"
        );
    }

    #[test]
    fn test_store_error_keeps_source() {
        use std::error::Error as _;

        let inner = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked");
        let err = Error::store(inner);
        assert_eq!(err.to_string(), "Storage error: locked");
        let source = err.source().unwrap();
        let io = source.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("missing"));
    }
}
