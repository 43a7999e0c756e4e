//! Database schema.
//!
//! There are no forward migrations: a database written with any other schema
//! version is dropped and recreated empty.

use rusqlite::Connection;
use tracing::warn;

use crate::error::Result;

/// Current schema version.
pub const SCHEMA_VERSION: i32 = 3;

const TABLES: [&str; 4] = ["climate_data", "tasks", "verification_records", "schema_version"];

/// Initialize the database schema.
pub fn initialize(conn: &Connection) -> Result<()> {
    let version = get_schema_version(conn)?;

    if version == SCHEMA_VERSION {
        return Ok(());
    }
    if version != 0 {
        warn!(
            "Database schema version {} does not match {}, recreating all tables",
            version, SCHEMA_VERSION
        );
        drop_all(conn)?;
    }
    create_schema(conn)?;
    set_schema_version(conn, SCHEMA_VERSION)?;
    Ok(())
}

/// Get the current schema version, 0 for a fresh database.
pub(crate) fn get_schema_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='schema_version'",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version WHERE id = 1", [], |row| {
            row.get(0)
        })
        .ok();

    Ok(version.unwrap_or(0))
}

pub(crate) fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO schema_version (id, version) VALUES (1, ?)",
        [version],
    )?;
    Ok(())
}

fn drop_all(conn: &Connection) -> Result<()> {
    for table in TABLES {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
    }
    Ok(())
}

fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            version INTEGER NOT NULL
        );

        -- Climate journal; timestamp in unix milliseconds
        CREATE TABLE IF NOT EXISTS climate_data (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            temperature TEXT NOT NULL,
            humidity TEXT NOT NULL,
            pressure TEXT NOT NULL,
            timestamp INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_climate_timestamp
            ON climate_data(timestamp);

        -- Task scheduler; date as YYYY-MM-DD
        CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            date TEXT NOT NULL,
            is_completed INTEGER NOT NULL DEFAULT 0,
            created_at INTEGER NOT NULL,
            priority INTEGER NOT NULL DEFAULT 0,
            category TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_tasks_date
            ON tasks(date, is_completed);

        -- Verification records, one per device number
        CREATE TABLE IF NOT EXISTS verification_records (
            id TEXT PRIMARY KEY,
            protocol_number TEXT NOT NULL,
            device_number TEXT NOT NULL,
            device_type TEXT NOT NULL,
            device_model TEXT NOT NULL,
            lower_range TEXT NOT NULL,
            upper_range TEXT NOT NULL,
            registry_number TEXT NOT NULL,
            accuracy_class TEXT NOT NULL,
            verification_date TEXT NOT NULL,
            next_verification_date TEXT NOT NULL,
            status TEXT NOT NULL,
            measurement_result TEXT NOT NULL,
            document_paths TEXT NOT NULL DEFAULT '[]',
            point_count INTEGER NOT NULL,
            transform_function TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_verification_device
            ON verification_records(device_number);
        "#,
    )?;

    Ok(())
}
