//! Data models for stored data.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use poverka_types::ClimateConditions;

/// A climate journal entry stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClimateRecord {
    /// Database row ID.
    pub id: i64,
    /// Temperature in °C, as entered.
    pub temperature: String,
    /// Relative humidity in %, as entered.
    pub humidity: String,
    /// Atmospheric pressure in kPa, as entered.
    pub pressure: String,
    /// When the entry was saved.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl ClimateRecord {
    /// The measured values without the row metadata.
    pub fn conditions(&self) -> ClimateConditions {
        ClimateConditions::new(
            self.temperature.as_str(),
            self.humidity.as_str(),
            self.pressure.as_str(),
        )
    }
}

pub(crate) fn to_unix_millis(t: OffsetDateTime) -> i64 {
    (t.unix_timestamp_nanos() / 1_000_000) as i64
}

pub(crate) fn from_unix_millis(ms: i64) -> Option<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()
}
