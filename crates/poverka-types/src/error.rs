//! Error types for parsing poverka record fields.

use thiserror::Error;

/// Errors that can occur when parsing textual record fields.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Unknown transform function name.
    #[error("Unknown transform function: {0:?} (expected none, 75mV or 5A)")]
    UnknownTransform(String),

    /// Unknown verification status name.
    #[error("Unknown verification status: {0:?} (expected PASSED, FAILED or PENDING)")]
    UnknownStatus(String),

    /// Task priority outside of the known levels.
    #[error("Unknown task priority level: {0} (expected 0, 1 or 2)")]
    UnknownPriority(i64),

    /// Date string in neither `YYYY-MM-DD` nor `DD.MM.YYYY` form.
    #[error("Invalid date: {0:?} (use YYYY-MM-DD or DD.MM.YYYY)")]
    InvalidDate(String),
}

/// Result type alias using poverka-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
