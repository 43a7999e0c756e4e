//! Core record types for the climate journal, task scheduler and
//! verification records.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::error::{ParseError, ParseResult};

/// Unit conversion between the reference readings and the instrument scale.
///
/// Reference readings are taken either directly in the instrument unit or
/// through a shunt. The shunt variants describe how a raw reading relates to
/// the value shown on the instrument.
///
/// # Examples
///
/// ```
/// use poverka_types::TransformFunction;
///
/// assert_eq!("75mV".parse::<TransformFunction>(), Ok(TransformFunction::Shunt75mV));
/// assert_eq!("Нет".parse::<TransformFunction>(), Ok(TransformFunction::None));
/// assert_eq!(TransformFunction::Shunt5A.to_string(), "5A");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TransformFunction {
    /// Readings are taken in the instrument unit.
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "none", alias = "Нет", alias = ""))]
    None,
    /// Full scale corresponds to 75 mV across a shunt.
    #[cfg_attr(feature = "serde", serde(rename = "75mV"))]
    Shunt75mV,
    /// Readings are taken through a 5 A current transformer.
    #[cfg_attr(feature = "serde", serde(rename = "5A"))]
    Shunt5A,
}

impl TransformFunction {
    /// All transform functions, in menu order.
    pub const ALL: [TransformFunction; 3] = [
        TransformFunction::None,
        TransformFunction::Shunt75mV,
        TransformFunction::Shunt5A,
    ];

    /// Canonical textual form used in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformFunction::None => "none",
            TransformFunction::Shunt75mV => "75mV",
            TransformFunction::Shunt5A => "5A",
        }
    }

    /// Unit of the raw reference readings, or `None` when readings are taken
    /// in the instrument's own unit.
    #[must_use]
    pub fn reading_unit(&self) -> Option<&'static str> {
        match self {
            TransformFunction::None => None,
            TransformFunction::Shunt75mV => Some("мВ"),
            TransformFunction::Shunt5A => Some("А"),
        }
    }

    /// Returns `true` if readings pass through a shunt.
    #[must_use]
    pub fn is_transformed(&self) -> bool {
        !matches!(self, TransformFunction::None)
    }

    /// Parse leniently, treating anything unrecognised as no transform.
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for TransformFunction {
    type Err = ParseError;

    fn from_str(s: &str) -> ParseResult<Self> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "" | "none" | "нет" => Ok(TransformFunction::None),
            "75mv" | "75мв" => Ok(TransformFunction::Shunt75mV),
            "5a" | "5а" => Ok(TransformFunction::Shunt5A),
            _ => Err(ParseError::UnknownTransform(trimmed.to_string())),
        }
    }
}

impl fmt::Display for TransformFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a verification session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum VerificationStatus {
    /// All points within tolerance.
    #[default]
    Passed,
    /// At least one point out of tolerance.
    Failed,
    /// Session saved before the measurements were complete.
    Pending,
}

impl VerificationStatus {
    /// Canonical textual form used in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Passed => "PASSED",
            VerificationStatus::Failed => "FAILED",
            VerificationStatus::Pending => "PENDING",
        }
    }

    /// Verdict printed in the protocol conclusion.
    #[must_use]
    pub fn verdict(&self) -> &'static str {
        match self {
            VerificationStatus::Passed => "Годен",
            VerificationStatus::Failed => "Не годен",
            VerificationStatus::Pending => "Поверка не завершена",
        }
    }

    /// Returns `true` for [`VerificationStatus::Passed`].
    #[must_use]
    pub fn is_passed(&self) -> bool {
        matches!(self, VerificationStatus::Passed)
    }
}

impl FromStr for VerificationStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> ParseResult<Self> {
        match s.trim().to_uppercase().as_str() {
            "PASSED" => Ok(VerificationStatus::Passed),
            "FAILED" => Ok(VerificationStatus::Failed),
            "PENDING" => Ok(VerificationStatus::Pending),
            other => Err(ParseError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Climate conditions as entered by the operator.
///
/// Values are kept as entered text; the journal never reformats them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClimateConditions {
    /// Temperature in °C.
    pub temperature: String,
    /// Relative humidity in %.
    pub humidity: String,
    /// Atmospheric pressure in kPa.
    pub pressure: String,
}

impl ClimateConditions {
    /// Create conditions from the three entered values.
    pub fn new(
        temperature: impl Into<String>,
        humidity: impl Into<String>,
        pressure: impl Into<String>,
    ) -> Self {
        Self {
            temperature: temperature.into(),
            humidity: humidity.into(),
            pressure: pressure.into(),
        }
    }

    /// Returns `true` if no value has been entered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.temperature.is_empty() && self.humidity.is_empty() && self.pressure.is_empty()
    }
}

/// Task priority level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum TaskPriority {
    /// Ordinary task.
    #[default]
    Normal = 0,
    /// High priority.
    High = 1,
    /// Urgent.
    Urgent = 2,
}

impl TaskPriority {
    /// Numeric level stored in the database.
    #[must_use]
    pub fn level(&self) -> i64 {
        *self as i64
    }

    /// Convert a stored level back into a priority.
    pub fn from_level(level: i64) -> ParseResult<Self> {
        match level {
            0 => Ok(TaskPriority::Normal),
            1 => Ok(TaskPriority::High),
            2 => Ok(TaskPriority::Urgent),
            other => Err(ParseError::UnknownPriority(other)),
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskPriority::Normal => write!(f, "normal"),
            TaskPriority::High => write!(f, "high"),
            TaskPriority::Urgent => write!(f, "urgent"),
        }
    }
}

/// A scheduled task.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Task {
    /// Database row ID.
    pub id: i64,
    /// Short title.
    pub title: String,
    /// Optional longer description (empty when absent).
    pub description: String,
    /// Day the task is scheduled for.
    pub date: Date,
    /// Whether the task has been completed.
    pub completed: bool,
    /// When the task was created.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub created_at: OffsetDateTime,
    /// Priority level.
    pub priority: TaskPriority,
    /// Optional free-form category.
    pub category: Option<String>,
}

/// A task that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub date: Date,
    pub priority: TaskPriority,
    pub category: Option<String>,
}

impl NewTask {
    /// Create a normal-priority task for the given day.
    pub fn new(title: impl Into<String>, date: Date) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            date,
            priority: TaskPriority::Normal,
            category: None,
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the priority.
    pub fn priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Set the category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Snapshot of an instrument verification session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VerificationRecord {
    /// Record identifier (UUID v4).
    pub id: String,
    /// Protocol number.
    pub protocol_number: String,
    /// Instrument serial number; also the device profile key.
    pub device_number: String,
    /// Kind of instrument (e.g. "Вольтметр").
    pub device_type: String,
    /// Instrument model (e.g. "М42100").
    pub device_model: String,
    /// Lower measurement range bound, as entered.
    pub lower_range: String,
    /// Upper measurement range bound, as entered.
    pub upper_range: String,
    /// Number in the state register of measuring instruments.
    pub registry_number: String,
    /// Accuracy class in percent, as entered.
    pub accuracy_class: String,
    /// Day the verification was performed.
    pub verification_date: Date,
    /// Day the next verification is due.
    pub next_verification_date: Date,
    /// Verification outcome.
    pub status: VerificationStatus,
    /// Human-readable summary of the measurement table.
    pub measurement_result: String,
    /// Generated protocol files.
    pub document_paths: Vec<String>,
    /// Number of calibration points.
    pub point_count: u32,
    /// Transform function the readings were taken with.
    pub transform_function: TransformFunction,
}

impl VerificationRecord {
    /// Generate a fresh record identifier.
    #[must_use]
    pub fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// The device profile stored with this record.
    #[must_use]
    pub fn profile(&self) -> DeviceProfile {
        DeviceProfile::from(self)
    }
}

/// Instrument description reused to pre-fill a new verification session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceProfile {
    pub device_number: String,
    pub device_type: String,
    pub device_model: String,
    pub lower_range: String,
    pub upper_range: String,
    pub point_count: u32,
    pub transform_function: TransformFunction,
    pub registry_number: String,
    pub accuracy_class: String,
}

impl From<&VerificationRecord> for DeviceProfile {
    fn from(record: &VerificationRecord) -> Self {
        Self {
            device_number: record.device_number.clone(),
            device_type: record.device_type.clone(),
            device_model: record.device_model.clone(),
            lower_range: record.lower_range.clone(),
            upper_range: record.upper_range.clone(),
            point_count: record.point_count,
            transform_function: record.transform_function,
            registry_number: record.registry_number.clone(),
            accuracy_class: record.accuracy_class.clone(),
        }
    }
}

/// Parse a day in `YYYY-MM-DD` or `DD.MM.YYYY` form.
///
/// ```
/// use poverka_types::parse_date;
/// use time::macros::date;
///
/// assert_eq!(parse_date("2024-02-16"), Ok(date!(2024 - 02 - 16)));
/// assert_eq!(parse_date("16.02.2024"), Ok(date!(2024 - 02 - 16)));
/// assert!(parse_date("16/02/2024").is_err());
/// ```
pub fn parse_date(s: &str) -> ParseResult<Date> {
    let s = s.trim();
    let iso = format_description!("[year]-[month]-[day]");
    let dotted = format_description!("[day].[month].[year]");
    Date::parse(s, &iso)
        .or_else(|_| Date::parse(s, &dotted))
        .map_err(|_| ParseError::InvalidDate(s.to_string()))
}

/// Format a day as `DD.MM.YYYY`.
#[must_use]
pub fn format_date(date: Date) -> String {
    format!(
        "{:02}.{:02}.{:04}",
        date.day(),
        u8::from(date.month()),
        date.year()
    )
}

const MONTHS_GENITIVE: [&str; 12] = [
    "января",
    "февраля",
    "марта",
    "апреля",
    "мая",
    "июня",
    "июля",
    "августа",
    "сентября",
    "октября",
    "ноября",
    "декабря",
];

/// Format a day in the long Russian form used in protocols,
/// e.g. `16 февраля 2024 г.`.
#[must_use]
pub fn format_date_long(date: Date) -> String {
    let month = MONTHS_GENITIVE[usize::from(u8::from(date.month())) - 1];
    format!("{} {} {} г.", date.day(), month, date.year())
}
