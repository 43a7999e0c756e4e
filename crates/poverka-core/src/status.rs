//! Progress state of long-running workflow operations.

use std::fmt;

/// State of an operation such as saving a record, generating a protocol or
/// loading climate conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OperationStatus<T = ()> {
    /// Not started.
    #[default]
    Idle,
    /// In progress.
    Loading,
    /// Finished successfully.
    Success(T),
    /// Failed with a message for the operator.
    Error(String),
}

impl<T> OperationStatus<T> {
    /// Collapse a result into a terminal status.
    pub fn from_result<E: fmt::Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => OperationStatus::Success(value),
            Err(e) => OperationStatus::Error(e.to_string()),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, OperationStatus::Loading)
    }

    /// Returns `true` for `Success` or `Error`.
    pub fn is_finished(&self) -> bool {
        matches!(self, OperationStatus::Success(_) | OperationStatus::Error(_))
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            OperationStatus::Error(msg) => Some(msg),
            _ => None,
        }
    }
}
