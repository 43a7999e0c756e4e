//! Verification workflow library for electrical measuring instruments.
//!
//! This crate holds everything between the stored records and the user
//! interface:
//!
//! - **Error engine**: reduced errors and variation of calibration points,
//!   with 75 mV and 5 A shunt conversions
//! - **Sessions**: the editable state of one verification, kept consistent
//!   when range, transform or point count change
//! - **Climate validation**: per-field checks of temperature, humidity and
//!   pressure against laboratory limits
//! - **Protocols**: A4 PDF protocols laid out section by section
//! - **Reminder**: the daily climate-journal notification policy
//!
//! # Quick Start
//!
//! ```
//! use poverka_core::{TransformFunction, VerificationSession};
//!
//! let mut session = VerificationSession::new();
//! session.device_type = "Амперметр".to_string();
//! session.set_range("0", "100");
//! session.set_transform(TransformFunction::Shunt75mV);
//!
//! // 37.5 mV across the shunt is exactly 50 A on a 0..100 A scale.
//! session.update_reading(0, 2, 37.5, 37.5)?;
//! let point = &session.groups()[0].points()[2];
//! assert!((point.error_ascending()).abs() < 1e-9);
//! # Ok::<(), poverka_core::Error>(())
//! ```

pub mod calibration;
pub mod error;
pub mod protocol;
pub mod reminder;
pub mod session;
pub mod status;
pub mod units;
pub mod validation;

pub use poverka_types::types;

// Core exports
pub use calibration::{MeasurementGroup, MeasurementPoint, RangeBounds};
pub use error::{Error, Result};
pub use protocol::{
    ProtocolConfig, ProtocolData, ProtocolFile, ProtocolOutcome, list_protocols,
    protocol_file_name, write_protocol,
};
pub use reminder::{Notifier, Reminder, ReminderDecision, ReminderSchedule, SkipReason};
pub use session::{PointInput, SessionInput, VerificationSession, add_one_year};
pub use status::OperationStatus;
pub use validation::{
    ClimateField, ClimateLimits, ClimateValidator, FieldError, ValidationErrors,
};

// Re-export from poverka-types
pub use poverka_types::{
    ClimateConditions, DeviceProfile, NewTask, Task, TaskPriority, TransformFunction,
    VerificationRecord, VerificationStatus,
};
