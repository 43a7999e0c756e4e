//! Query builder for the climate journal.
//!
//! # Example
//!
//! ```
//! use poverka_store::{ClimateQuery, Store};
//! use time::macros::{date, offset};
//!
//! let store = Store::open_in_memory()?;
//!
//! // Everything recorded on one local day, oldest first
//! let query = ClimateQuery::day(date!(2024 - 02 - 16), offset!(+5)).oldest_first();
//! let entries = store.query_climate(&query)?;
//! assert!(entries.is_empty());
//! # Ok::<(), poverka_store::Error>(())
//! ```

use time::{Date, Duration, OffsetDateTime, Time, UtcOffset};

use crate::models::to_unix_millis;

/// First and last instant of a local day, both inclusive.
pub fn day_bounds(date: Date, offset: UtcOffset) -> (OffsetDateTime, OffsetDateTime) {
    let start = date.with_time(Time::MIDNIGHT).assume_offset(offset);
    let end = start + Duration::days(1) - Duration::milliseconds(1);
    (start, end)
}

/// Fluent query builder for climate entries.
///
/// By default, queries return results ordered by timestamp descending
/// (newest first).
#[derive(Debug, Default, Clone)]
pub struct ClimateQuery {
    /// Include only entries at or after this time.
    pub since: Option<OffsetDateTime>,
    /// Include only entries at or before this time.
    pub until: Option<OffsetDateTime>,
    /// Maximum number of results.
    pub limit: Option<u32>,
    /// Offset for pagination.
    pub offset: Option<u32>,
    /// Order by timestamp descending (newest first).
    pub newest_first: bool,
}

impl ClimateQuery {
    /// All entries, newest first.
    pub fn new() -> Self {
        Self {
            newest_first: true,
            ..Default::default()
        }
    }

    /// Entries of one local day.
    pub fn day(date: Date, offset: UtcOffset) -> Self {
        let (start, end) = day_bounds(date, offset);
        Self::new().since(start).until(end)
    }

    pub fn since(mut self, time: OffsetDateTime) -> Self {
        self.since = Some(time);
        self
    }

    pub fn until(mut self, time: OffsetDateTime) -> Self {
        self.until = Some(time);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Order results chronologically, e.g. for export.
    pub fn oldest_first(mut self) -> Self {
        self.newest_first = false;
        self
    }

    /// Build the SQL WHERE clause and parameters.
    pub(crate) fn build_where(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(since) = self.since {
            conditions.push("timestamp >= ?");
            params.push(Box::new(to_unix_millis(since)));
        }

        if let Some(until) = self.until {
            conditions.push("timestamp <= ?");
            params.push(Box::new(to_unix_millis(until)));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    /// Build the full SQL query.
    pub(crate) fn build_sql(&self) -> String {
        let (where_clause, _) = self.build_where();
        let order = if self.newest_first { "DESC" } else { "ASC" };

        let mut sql = format!(
            "SELECT id, temperature, humidity, pressure, timestamp \
             FROM climate_data {} ORDER BY timestamp {}, id {}",
            where_clause, order, order
        );

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        } else if self.offset.is_some() {
            // SQLite needs a LIMIT before OFFSET
            sql.push_str(" LIMIT -1");
        }

        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        sql
    }
}
