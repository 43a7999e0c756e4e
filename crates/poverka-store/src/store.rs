//! Main store implementation.

use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use time::{Date, Month, OffsetDateTime, UtcOffset};
use tracing::{debug, info};

use poverka_types::{
    ClimateConditions, DeviceProfile, NewTask, Task, TaskPriority, TransformFunction,
    VerificationRecord, VerificationStatus,
};

use crate::error::{Error, Result};
use crate::models::{ClimateRecord, from_unix_millis, to_unix_millis};
use crate::queries::ClimateQuery;
use crate::schema;

/// SQLite-based store for the climate journal, tasks and verification
/// records.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open or create a database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| Error::CreateDirectory {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
            }
        }

        info!("Opening database at {}", path.display());
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        schema::initialize(&conn)?;

        Ok(Self { conn })
    }

    /// Open the default database location.
    pub fn open_default() -> Result<Self> {
        Self::open(crate::default_db_path())
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }
}

fn conversion_error<E>(index: usize, ty: Type, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(index, ty, Box::new(err))
}

fn millis_column(row: &Row<'_>, index: usize) -> rusqlite::Result<OffsetDateTime> {
    let ms: i64 = row.get(index)?;
    from_unix_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(index, ms))
}

/// Turn a plain search term into a substring pattern; explicit `%`/`_`
/// wildcards are passed through.
fn like_pattern(pattern: &str) -> String {
    if pattern.contains(['%', '_']) {
        pattern.to_string()
    } else {
        format!("%{pattern}%")
    }
}

// Climate journal operations
impl Store {
    /// Record climate conditions taken at `at`.
    pub fn insert_climate(&self, conditions: &ClimateConditions, at: OffsetDateTime) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO climate_data (temperature, humidity, pressure, timestamp)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![
                conditions.temperature,
                conditions.humidity,
                conditions.pressure,
                to_unix_millis(at),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Inserted climate entry {}", id);
        Ok(id)
    }

    /// Query climate entries with filters.
    pub fn query_climate(&self, query: &ClimateQuery) -> Result<Vec<ClimateRecord>> {
        let sql = query.build_sql();
        let (_, params) = query.build_where();

        debug!("Executing query: {}", sql);

        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map(params_ref.as_slice(), |row| {
                Ok(ClimateRecord {
                    id: row.get(0)?,
                    temperature: row.get(1)?,
                    humidity: row.get(2)?,
                    pressure: row.get(3)?,
                    timestamp: millis_column(row, 4)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// The most recent climate entry.
    pub fn latest_climate(&self) -> Result<Option<ClimateRecord>> {
        let mut records = self.query_climate(&ClimateQuery::new().limit(1))?;
        Ok(records.pop())
    }

    /// Count entries matching the time filters of `query`.
    pub fn count_climate(&self, query: &ClimateQuery) -> Result<u64> {
        let (where_clause, params) = query.build_where();
        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let count: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM climate_data {where_clause}"),
            params_ref.as_slice(),
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Returns `true` if anything was recorded on the local day `date`.
    pub fn has_climate_on(&self, date: Date, offset: UtcOffset) -> Result<bool> {
        Ok(self.count_climate(&ClimateQuery::day(date, offset))? > 0)
    }

    /// Delete entries matching the time filters of `query`.
    ///
    /// Limit and offset are ignored.
    pub fn delete_climate(&self, query: &ClimateQuery) -> Result<usize> {
        let (where_clause, params) = query.build_where();
        let params_ref: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let deleted = self.conn.execute(
            &format!("DELETE FROM climate_data {where_clause}"),
            params_ref.as_slice(),
        )?;
        info!("Deleted {} climate entries", deleted);
        Ok(deleted)
    }

    /// Write matching entries as CSV with a header row. Returns the number
    /// of entries written.
    pub fn export_climate_csv<W: Write>(&self, query: &ClimateQuery, writer: W) -> Result<usize> {
        let records = self.query_climate(query)?;
        let mut csv = csv::Writer::from_writer(writer);
        for record in &records {
            csv.serialize(record)?;
        }
        csv.flush()?;
        Ok(records.len())
    }
}

const TASK_COLUMNS: &str =
    "id, title, description, date, is_completed, created_at, priority, category";

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let level: i64 = row.get(6)?;
    Ok(Task {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        date: row.get(3)?,
        completed: row.get(4)?,
        created_at: millis_column(row, 5)?,
        priority: TaskPriority::from_level(level)
            .map_err(|e| conversion_error(6, Type::Integer, e))?,
        category: row.get(7)?,
    })
}

// Task operations
impl Store {
    /// Store a new task created now. Returns its ID.
    pub fn insert_task(&self, task: &NewTask) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO tasks (title, description, date, is_completed, created_at, priority, category)
             VALUES (?1, ?2, ?3, 0, ?4, ?5, ?6)",
            rusqlite::params![
                task.title,
                task.description,
                task.date,
                to_unix_millis(OffsetDateTime::now_utc()),
                task.priority.level(),
                task.category,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        debug!("Inserted task {} for {}", id, task.date);
        Ok(id)
    }

    /// Overwrite an existing task.
    pub fn update_task(&self, task: &Task) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE tasks SET title = ?2, description = ?3, date = ?4, is_completed = ?5,
                priority = ?6, category = ?7
             WHERE id = ?1",
            rusqlite::params![
                task.id,
                task.title,
                task.description,
                task.date,
                task.completed,
                task.priority.level(),
                task.category,
            ],
        )?;
        if updated == 0 {
            return Err(Error::TaskNotFound(task.id));
        }
        Ok(())
    }

    /// Delete a task. Returns `false` if it did not exist.
    pub fn delete_task(&self, id: i64) -> Result<bool> {
        let deleted = self.conn.execute("DELETE FROM tasks WHERE id = ?", [id])?;
        Ok(deleted > 0)
    }

    /// Get a task by ID.
    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? LIMIT 1"),
                [id],
                task_from_row,
            )
            .optional()?;
        Ok(task)
    }

    /// Tasks scheduled for a day: incomplete first, then newest first.
    pub fn tasks_for_date(&self, date: Date) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE date = ?
             ORDER BY is_completed ASC, created_at DESC, id DESC"
        ))?;
        let tasks = stmt
            .query_map([date], task_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    /// Distinct days of a month that have at least one task, ascending.
    pub fn dates_with_tasks(&self, year: i32, month: Month) -> Result<Vec<Date>> {
        let prefix = format!("{:04}-{:02}-%", year, u8::from(month));
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT date FROM tasks WHERE date LIKE ? ORDER BY date ASC")?;
        let dates = stmt
            .query_map([prefix], |row| row.get(0))?
            .collect::<std::result::Result<Vec<Date>, _>>()?;
        Ok(dates)
    }

    /// Mark a task completed or not.
    pub fn set_task_completed(&self, id: i64, completed: bool) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE tasks SET is_completed = ?2 WHERE id = ?1",
            rusqlite::params![id, completed],
        )?;
        if updated == 0 {
            return Err(Error::TaskNotFound(id));
        }
        Ok(())
    }

    /// Flip the completion flag. Returns the new state.
    pub fn toggle_task(&self, id: i64) -> Result<bool> {
        let completed: Option<bool> = self
            .conn
            .query_row(
                "UPDATE tasks SET is_completed = 1 - is_completed WHERE id = ?
                 RETURNING is_completed",
                [id],
                |row| row.get(0),
            )
            .optional()?;
        completed.ok_or(Error::TaskNotFound(id))
    }

    /// Delete completed tasks scheduled strictly before `before`.
    pub fn cleanup_completed_before(&self, before: Date) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM tasks WHERE is_completed = 1 AND date < ?",
            [before],
        )?;
        info!("Removed {} completed tasks before {}", deleted, before);
        Ok(deleted)
    }

    /// Number of incomplete tasks on a day.
    pub fn active_task_count(&self, date: Date) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE date = ? AND is_completed = 0",
            [date],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Number of incomplete tasks between two days, both inclusive.
    pub fn active_task_count_between(&self, start: Date, end: Date) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE date BETWEEN ?1 AND ?2 AND is_completed = 0",
            [start, end],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Move a task to another day.
    pub fn change_task_date(&self, id: i64, date: Date) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE tasks SET date = ?2 WHERE id = ?1",
            rusqlite::params![id, date],
        )?;
        if updated == 0 {
            return Err(Error::TaskNotFound(id));
        }
        Ok(())
    }
}

const VERIFICATION_COLUMNS: &str = "id, protocol_number, device_number, device_type, device_model, \
     lower_range, upper_range, registry_number, accuracy_class, verification_date, \
     next_verification_date, status, measurement_result, document_paths, point_count, \
     transform_function";

fn verification_from_row(row: &Row<'_>) -> rusqlite::Result<VerificationRecord> {
    let status: String = row.get(11)?;
    let paths: String = row.get(13)?;
    let point_count: i64 = row.get(14)?;
    let transform: String = row.get(15)?;
    Ok(VerificationRecord {
        id: row.get(0)?,
        protocol_number: row.get(1)?,
        device_number: row.get(2)?,
        device_type: row.get(3)?,
        device_model: row.get(4)?,
        lower_range: row.get(5)?,
        upper_range: row.get(6)?,
        registry_number: row.get(7)?,
        accuracy_class: row.get(8)?,
        verification_date: row.get(9)?,
        next_verification_date: row.get(10)?,
        status: VerificationStatus::from_str(&status)
            .map_err(|e| conversion_error(11, Type::Text, e))?,
        measurement_result: row.get(12)?,
        document_paths: serde_json::from_str(&paths)
            .map_err(|e| conversion_error(13, Type::Text, e))?,
        point_count: u32::try_from(point_count)
            .map_err(|_| rusqlite::Error::IntegralValueOutOfRange(14, point_count))?,
        transform_function: TransformFunction::parse_lenient(&transform),
    })
}

// Verification record operations
impl Store {
    /// Save a record, superseding any earlier record for the same device
    /// number. Returns the number of superseded records.
    pub fn save_verification(&self, record: &VerificationRecord) -> Result<usize> {
        let paths = serde_json::to_string(&record.document_paths)?;
        let tx = self.conn.unchecked_transaction()?;

        let superseded = tx.execute(
            "DELETE FROM verification_records WHERE device_number = ?1 AND id != ?2",
            rusqlite::params![record.device_number, record.id],
        )?;

        tx.execute(
            &format!(
                "INSERT OR REPLACE INTO verification_records ({VERIFICATION_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
            ),
            rusqlite::params![
                record.id,
                record.protocol_number,
                record.device_number,
                record.device_type,
                record.device_model,
                record.lower_range,
                record.upper_range,
                record.registry_number,
                record.accuracy_class,
                record.verification_date,
                record.next_verification_date,
                record.status.as_str(),
                record.measurement_result,
                paths,
                record.point_count,
                record.transform_function.as_str(),
            ],
        )?;
        tx.commit()?;

        info!(
            "Saved verification {} for device {} ({} superseded)",
            record.id, record.device_number, superseded
        );
        Ok(superseded)
    }

    fn query_verifications(
        &self,
        filter: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<VerificationRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VERIFICATION_COLUMNS} FROM verification_records {filter}
             ORDER BY verification_date DESC, rowid DESC"
        ))?;
        let records = stmt
            .query_map(params, verification_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// All records, newest verification date first.
    pub fn list_verifications(&self) -> Result<Vec<VerificationRecord>> {
        self.query_verifications("", &[])
    }

    /// Records whose device number matches `pattern`.
    ///
    /// A plain term matches anywhere in the number; `%` and `_` wildcards
    /// are honoured as in SQL `LIKE`.
    pub fn search_verifications(&self, pattern: &str) -> Result<Vec<VerificationRecord>> {
        let pattern = like_pattern(pattern);
        self.query_verifications("WHERE device_number LIKE ?", &[&pattern])
    }

    /// The record stored for a device number.
    pub fn get_verification_by_device(
        &self,
        device_number: &str,
    ) -> Result<Option<VerificationRecord>> {
        let records = self.query_verifications("WHERE device_number = ?", &[&device_number])?;
        Ok(records.into_iter().next())
    }

    /// Delete all records of a device number. Returns the number deleted.
    pub fn delete_verification_by_device(&self, device_number: &str) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM verification_records WHERE device_number = ?",
            [device_number],
        )?;
        Ok(deleted)
    }

    /// Delete one record by ID. Returns `false` if it did not exist.
    pub fn delete_verification(&self, id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM verification_records WHERE id = ?", [id])?;
        Ok(deleted > 0)
    }

    /// Device profiles of every stored record, ordered by device number.
    pub fn device_profiles(&self) -> Result<Vec<DeviceProfile>> {
        let mut profiles: Vec<DeviceProfile> = self
            .list_verifications()?
            .iter()
            .map(DeviceProfile::from)
            .collect();
        profiles.sort_by(|a, b| a.device_number.cmp(&b.device_number));
        profiles.dedup_by(|a, b| a.device_number == b.device_number);
        Ok(profiles)
    }

    /// Profile of one device.
    pub fn device_profile(&self, device_number: &str) -> Result<DeviceProfile> {
        self.get_verification_by_device(device_number)?
            .map(|record| record.profile())
            .ok_or_else(|| Error::DeviceNotFound(device_number.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime, offset};

    fn conditions(t: &str) -> ClimateConditions {
        ClimateConditions::new(t, "45", "99.3")
    }

    fn record(device: &str, protocol: &str, day: Date) -> VerificationRecord {
        VerificationRecord {
            id: VerificationRecord::new_id(),
            protocol_number: protocol.to_string(),
            device_number: device.to_string(),
            device_type: "Вольтметр".to_string(),
            device_model: "М42100".to_string(),
            lower_range: "0".to_string(),
            upper_range: "150".to_string(),
            registry_number: "17057-08".to_string(),
            accuracy_class: "1.5".to_string(),
            verification_date: day,
            next_verification_date: day.replace_year(day.year() + 1).unwrap(),
            status: VerificationStatus::Passed,
            measurement_result: "ok".to_string(),
            document_paths: vec!["/tmp/Протокол_1.pdf".to_string()],
            point_count: 5,
            transform_function: TransformFunction::Shunt5A,
        }
    }

    // --- climate ---

    #[test]
    fn test_insert_and_query_climate() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_climate(&conditions("20"), datetime!(2024-02-16 08:00 UTC))
            .unwrap();
        store
            .insert_climate(&conditions("21"), datetime!(2024-02-16 12:00 UTC))
            .unwrap();

        let all = store.query_climate(&ClimateQuery::new()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].temperature, "21");
        assert_eq!(all[0].timestamp, datetime!(2024-02-16 12:00 UTC));

        let oldest = store.query_climate(&ClimateQuery::new().oldest_first()).unwrap();
        assert_eq!(oldest[0].temperature, "20");

        let latest = store.latest_climate().unwrap().unwrap();
        assert_eq!(latest.conditions(), conditions("21"));
    }

    #[test]
    fn test_climate_day_uses_local_offset() {
        let store = Store::open_in_memory().unwrap();
        // 20:00 UTC on the 15th is already the 16th at +05:00
        store
            .insert_climate(&conditions("20"), datetime!(2024-02-15 20:00 UTC))
            .unwrap();

        assert!(store.has_climate_on(date!(2024 - 02 - 16), offset!(+5)).unwrap());
        assert!(!store.has_climate_on(date!(2024 - 02 - 16), offset!(UTC)).unwrap());
        assert!(store.has_climate_on(date!(2024 - 02 - 15), offset!(UTC)).unwrap());
    }

    #[test]
    fn test_delete_climate_for_day() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_climate(&conditions("19"), datetime!(2024-02-15 10:00 UTC))
            .unwrap();
        store
            .insert_climate(&conditions("20"), datetime!(2024-02-16 08:00 UTC))
            .unwrap();
        store
            .insert_climate(&conditions("21"), datetime!(2024-02-16 23:59:59 UTC))
            .unwrap();

        let today = ClimateQuery::day(date!(2024 - 02 - 16), offset!(UTC));
        assert_eq!(store.count_climate(&today).unwrap(), 2);
        assert_eq!(store.delete_climate(&today).unwrap(), 2);
        assert_eq!(store.count_climate(&ClimateQuery::new()).unwrap(), 1);
    }

    #[test]
    fn test_export_climate_csv() {
        let store = Store::open_in_memory().unwrap();
        store
            .insert_climate(&conditions("21,5"), datetime!(2024-02-16 08:00 UTC))
            .unwrap();

        let mut out = Vec::new();
        let written = store
            .export_climate_csv(&ClimateQuery::new(), &mut out)
            .unwrap();
        assert_eq!(written, 1);

        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("id,temperature,humidity,pressure,timestamp"));
        assert_eq!(
            lines.next(),
            Some("1,\"21,5\",45,99.3,2024-02-16T08:00:00Z")
        );
    }

    // --- tasks ---

    #[test]
    fn test_task_crud() {
        let store = Store::open_in_memory().unwrap();
        let id = store
            .insert_task(
                &NewTask::new("Поверить вольтметр", date!(2024 - 02 - 16))
                    .priority(TaskPriority::High)
                    .category("КИП"),
            )
            .unwrap();

        let mut task = store.get_task(id).unwrap().unwrap();
        assert_eq!(task.title, "Поверить вольтметр");
        assert_eq!(task.description, "");
        assert_eq!(task.priority, TaskPriority::High);
        assert_eq!(task.category.as_deref(), Some("КИП"));
        assert!(!task.completed);

        task.description = "М42100 №1024".to_string();
        task.priority = TaskPriority::Urgent;
        store.update_task(&task).unwrap();
        assert_eq!(store.get_task(id).unwrap().unwrap(), task);

        assert!(store.delete_task(id).unwrap());
        assert!(!store.delete_task(id).unwrap());
        assert!(store.get_task(id).unwrap().is_none());
    }

    #[test]
    fn test_update_missing_task() {
        let store = Store::open_in_memory().unwrap();
        let task = Task {
            id: 42,
            title: "x".into(),
            description: String::new(),
            date: date!(2024 - 02 - 16),
            completed: false,
            created_at: OffsetDateTime::now_utc(),
            priority: TaskPriority::Normal,
            category: None,
        };
        assert!(matches!(store.update_task(&task), Err(Error::TaskNotFound(42))));
        assert!(matches!(store.toggle_task(42), Err(Error::TaskNotFound(42))));
        assert!(matches!(
            store.change_task_date(42, date!(2024 - 02 - 17)),
            Err(Error::TaskNotFound(42))
        ));
    }

    #[test]
    fn test_tasks_for_date_order() {
        let store = Store::open_in_memory().unwrap();
        let day = date!(2024 - 02 - 16);
        let first = store.insert_task(&NewTask::new("first", day)).unwrap();
        let second = store.insert_task(&NewTask::new("second", day)).unwrap();
        let third = store.insert_task(&NewTask::new("third", day)).unwrap();
        store
            .insert_task(&NewTask::new("other day", date!(2024 - 02 - 17)))
            .unwrap();
        store.set_task_completed(third, true).unwrap();

        let ids: Vec<i64> = store
            .tasks_for_date(day)
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![second, first, third]);
    }

    #[test]
    fn test_toggle_and_counts() {
        let store = Store::open_in_memory().unwrap();
        let day = date!(2024 - 02 - 16);
        let a = store.insert_task(&NewTask::new("a", day)).unwrap();
        store.insert_task(&NewTask::new("b", day)).unwrap();
        store
            .insert_task(&NewTask::new("c", date!(2024 - 02 - 20)))
            .unwrap();

        assert_eq!(store.active_task_count(day).unwrap(), 2);
        assert!(store.toggle_task(a).unwrap());
        assert_eq!(store.active_task_count(day).unwrap(), 1);
        assert!(!store.toggle_task(a).unwrap());
        assert_eq!(store.active_task_count(day).unwrap(), 2);

        assert_eq!(
            store
                .active_task_count_between(date!(2024 - 02 - 16), date!(2024 - 02 - 20))
                .unwrap(),
            3
        );
        assert_eq!(
            store
                .active_task_count_between(date!(2024 - 02 - 17), date!(2024 - 02 - 19))
                .unwrap(),
            0
        );
    }

    #[test]
    fn test_dates_with_tasks() {
        let store = Store::open_in_memory().unwrap();
        for day in [
            date!(2024 - 02 - 20),
            date!(2024 - 02 - 03),
            date!(2024 - 02 - 20),
            date!(2024 - 03 - 01),
            date!(2023 - 02 - 10),
        ] {
            store.insert_task(&NewTask::new("t", day)).unwrap();
        }
        assert_eq!(
            store.dates_with_tasks(2024, Month::February).unwrap(),
            vec![date!(2024 - 02 - 03), date!(2024 - 02 - 20)]
        );
        assert!(store.dates_with_tasks(2024, Month::April).unwrap().is_empty());
    }

    #[test]
    fn test_cleanup_and_move() {
        let store = Store::open_in_memory().unwrap();
        let old_done = store
            .insert_task(&NewTask::new("old done", date!(2024 - 02 - 10)))
            .unwrap();
        let old_open = store
            .insert_task(&NewTask::new("old open", date!(2024 - 02 - 10)))
            .unwrap();
        let today_done = store
            .insert_task(&NewTask::new("today done", date!(2024 - 02 - 16)))
            .unwrap();
        store.set_task_completed(old_done, true).unwrap();
        store.set_task_completed(today_done, true).unwrap();

        assert_eq!(store.cleanup_completed_before(date!(2024 - 02 - 16)).unwrap(), 1);
        assert!(store.get_task(old_done).unwrap().is_none());
        assert!(store.get_task(today_done).unwrap().is_some());

        store.change_task_date(old_open, date!(2024 - 02 - 19)).unwrap();
        assert_eq!(
            store.get_task(old_open).unwrap().unwrap().date,
            date!(2024 - 02 - 19)
        );
    }

    // --- verifications ---

    #[test]
    fn test_save_and_get_verification() {
        let store = Store::open_in_memory().unwrap();
        let rec = record("A-1024", "17", date!(2024 - 02 - 16));
        assert_eq!(store.save_verification(&rec).unwrap(), 0);

        let loaded = store.get_verification_by_device("A-1024").unwrap().unwrap();
        assert_eq!(loaded, rec);
        assert!(store.get_verification_by_device("B-1").unwrap().is_none());
    }

    #[test]
    fn test_save_supersedes_same_device() {
        let store = Store::open_in_memory().unwrap();
        let first = record("A-1024", "17", date!(2023 - 02 - 16));
        let second = record("A-1024", "18", date!(2024 - 02 - 16));
        store.save_verification(&first).unwrap();
        store.save_verification(&record("B-7", "19", date!(2024 - 01 - 10))).unwrap();
        assert_eq!(store.save_verification(&second).unwrap(), 1);

        let all = store.list_verifications().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].protocol_number, "18");
        assert_eq!(all[1].device_number, "B-7");

        // Re-saving the same record replaces it in place
        assert_eq!(store.save_verification(&second).unwrap(), 0);
        assert_eq!(store.list_verifications().unwrap().len(), 2);
    }

    #[test]
    fn test_search_verifications() {
        let store = Store::open_in_memory().unwrap();
        store.save_verification(&record("A-1024", "1", date!(2024 - 02 - 16))).unwrap();
        store.save_verification(&record("A-2048", "2", date!(2024 - 02 - 17))).unwrap();
        store.save_verification(&record("B-1024", "3", date!(2024 - 02 - 18))).unwrap();

        assert_eq!(store.search_verifications("1024").unwrap().len(), 2);
        assert_eq!(store.search_verifications("A-%").unwrap().len(), 2);
        assert_eq!(store.search_verifications("A-_0_8").unwrap().len(), 1);
        assert!(store.search_verifications("zzz").unwrap().is_empty());
    }

    #[test]
    fn test_delete_verifications() {
        let store = Store::open_in_memory().unwrap();
        let a = record("A-1024", "1", date!(2024 - 02 - 16));
        store.save_verification(&a).unwrap();
        store.save_verification(&record("B-1", "2", date!(2024 - 02 - 16))).unwrap();

        assert!(store.delete_verification(&a.id).unwrap());
        assert!(!store.delete_verification(&a.id).unwrap());
        assert_eq!(store.delete_verification_by_device("B-1").unwrap(), 1);
        assert!(store.list_verifications().unwrap().is_empty());
    }

    #[test]
    fn test_device_profiles() {
        let store = Store::open_in_memory().unwrap();
        store.save_verification(&record("B-7", "1", date!(2024 - 02 - 16))).unwrap();
        store.save_verification(&record("A-1", "2", date!(2024 - 02 - 17))).unwrap();

        let profiles = store.device_profiles().unwrap();
        let numbers: Vec<&str> = profiles.iter().map(|p| p.device_number.as_str()).collect();
        assert_eq!(numbers, vec!["A-1", "B-7"]);
        assert_eq!(profiles[0].transform_function, TransformFunction::Shunt5A);
        assert_eq!(profiles[0].point_count, 5);

        assert_eq!(store.device_profile("B-7").unwrap().upper_range, "150");
        assert!(matches!(
            store.device_profile("missing"),
            Err(Error::DeviceNotFound(_))
        ));
    }

    #[test]
    fn test_legacy_transform_text_is_read() {
        let store = Store::open_in_memory().unwrap();
        let rec = record("A-1", "1", date!(2024 - 02 - 16));
        store.save_verification(&rec).unwrap();
        store
            .conn
            .execute(
                "UPDATE verification_records SET transform_function = 'Нет'",
                [],
            )
            .unwrap();
        let loaded = store.get_verification_by_device("A-1").unwrap().unwrap();
        assert_eq!(loaded.transform_function, TransformFunction::None);
    }

    #[test]
    fn test_like_pattern() {
        assert_eq!(like_pattern("1024"), "%1024%");
        assert_eq!(like_pattern("A-%"), "A-%");
    }
}
