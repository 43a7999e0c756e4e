//! Shared record types for the poverka metrology toolkit.
//!
//! This crate holds the data model used by the store, the calculation
//! engine and the command-line front end:
//!
//! - Task scheduler records and priorities
//! - Verification records and the device profiles derived from them
//! - Transform function selection (direct, 75 mV shunt, 5 A shunt)
//! - Date helpers for the `DD.MM.YYYY` and long Russian date forms
//!
//! # Example
//!
//! ```
//! use poverka_types::{TransformFunction, VerificationStatus};
//!
//! let transform: TransformFunction = "5A".parse().unwrap();
//! assert_eq!(transform.reading_unit(), Some("А"));
//! assert_eq!(VerificationStatus::Failed.verdict(), "Не годен");
//! ```

pub mod error;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{
    ClimateConditions, DeviceProfile, NewTask, Task, TaskPriority, TransformFunction,
    VerificationRecord, VerificationStatus, format_date, format_date_long, parse_date,
};
