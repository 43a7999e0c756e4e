//! Local persistence for the poverka metrology toolkit.
//!
//! This crate provides SQLite-based storage for the three record kinds the
//! lab keeps:
//!
//! - Climate journal entries (temperature, humidity, pressure)
//! - Day-scheduled tasks with priorities and categories
//! - Verification records, one per instrument, doubling as device profiles
//!
//! The schema is versioned without migrations: opening a database written
//! with another schema version drops and recreates every table.
//!
//! # Example
//!
//! ```no_run
//! use poverka_store::{ClimateQuery, Store};
//!
//! let store = Store::open_default()?;
//!
//! // Ten most recent journal entries
//! let entries = store.query_climate(&ClimateQuery::new().limit(10))?;
//! for entry in entries {
//!     println!("{} {} {}", entry.temperature, entry.humidity, entry.pressure);
//! }
//! # Ok::<(), poverka_store::Error>(())
//! ```

mod error;
mod models;
mod queries;
mod schema;
mod store;

pub use error::{Error, Result};
pub use models::ClimateRecord;
pub use queries::{ClimateQuery, day_bounds};
pub use schema::SCHEMA_VERSION;
pub use store::Store;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/poverka/poverka.db`
/// - macOS: `~/Library/Application Support/poverka/poverka.db`
/// - Windows: `C:\Users\<user>\AppData\Local\poverka\poverka.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("poverka")
        .join("poverka.db")
}
