//! Validation of climate readings before they are recorded.
//!
//! Each of the three fields is checked independently so the operator sees
//! every problem at once.
//!
//! # Example
//!
//! ```
//! use poverka_core::validation::{ClimateField, ClimateValidator};
//! use poverka_types::ClimateConditions;
//!
//! let validator = ClimateValidator::default();
//! assert!(validator.validate(&ClimateConditions::new("21.5", "45", "99.2")).is_ok());
//!
//! let errors = validator
//!     .validate(&ClimateConditions::new("", "45", "120"))
//!     .unwrap_err();
//! assert_eq!(errors.len(), 2);
//! assert!(errors.get(ClimateField::Temperature).is_some());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use poverka_types::ClimateConditions;

use crate::calibration::parse_decimal;

/// One of the three climate fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClimateField {
    Temperature,
    Humidity,
    Pressure,
}

impl ClimateField {
    fn subject(&self) -> &'static str {
        match self {
            ClimateField::Temperature => "Температура",
            ClimateField::Humidity => "Влажность",
            ClimateField::Pressure => "Давление",
        }
    }
}

/// Reason a field was rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldError {
    /// Nothing was entered.
    Empty(ClimateField),
    /// The value is not a number or lies outside `[min, max]`.
    OutOfRange {
        field: ClimateField,
        min: f64,
        max: f64,
    },
}

impl FieldError {
    pub fn field(&self) -> ClimateField {
        match self {
            FieldError::Empty(field) | FieldError::OutOfRange { field, .. } => *field,
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldError::Empty(ClimateField::Pressure) => {
                write!(f, "Давление не может быть пустым")
            }
            FieldError::Empty(field) => write!(f, "{} не может быть пустой", field.subject()),
            FieldError::OutOfRange { field, min, max } => {
                let verb = match field {
                    ClimateField::Pressure => "должно",
                    _ => "должна",
                };
                write!(f, "{} {} быть от {} до {}", field.subject(), verb, min, max)
            }
        }
    }
}

/// All field errors found in one reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The error for a specific field, if any.
    pub fn get(&self, field: ClimateField) -> Option<&FieldError> {
        self.0.iter().find(|e| e.field() == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

impl From<ValidationErrors> for crate::Error {
    fn from(errors: ValidationErrors) -> Self {
        crate::Error::Validation(errors)
    }
}

/// Accepted bounds for each climate field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimateLimits {
    /// Temperature bounds in °C.
    pub temperature: (f64, f64),
    /// Relative humidity bounds in %.
    pub humidity: (f64, f64),
    /// Atmospheric pressure bounds in kPa.
    pub pressure: (f64, f64),
}

impl Default for ClimateLimits {
    fn default() -> Self {
        Self {
            temperature: (15.0, 30.0),
            humidity: (0.0, 100.0),
            pressure: (80.0, 102.0),
        }
    }
}

/// Validator for entered climate readings.
#[derive(Debug, Clone, Default)]
pub struct ClimateValidator {
    limits: ClimateLimits,
}

impl ClimateValidator {
    pub fn new(limits: ClimateLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &ClimateLimits {
        &self.limits
    }

    /// Check all three fields, returning every error found.
    pub fn validate(&self, conditions: &ClimateConditions) -> Result<(), ValidationErrors> {
        let checks = [
            (ClimateField::Temperature, &conditions.temperature, self.limits.temperature),
            (ClimateField::Humidity, &conditions.humidity, self.limits.humidity),
            (ClimateField::Pressure, &conditions.pressure, self.limits.pressure),
        ];

        let errors: Vec<FieldError> = checks
            .into_iter()
            .filter_map(|(field, value, (min, max))| check_field(field, value, min, max))
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors(errors))
        }
    }
}

fn check_field(field: ClimateField, value: &str, min: f64, max: f64) -> Option<FieldError> {
    if value.trim().is_empty() {
        return Some(FieldError::Empty(field));
    }
    match parse_decimal(value) {
        Some(v) if (min..=max).contains(&v) => None,
        _ => Some(FieldError::OutOfRange { field, min, max }),
    }
}
