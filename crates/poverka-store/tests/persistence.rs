//! On-disk behaviour of the store.

use poverka_store::{ClimateQuery, SCHEMA_VERSION, Store};
use poverka_types::{ClimateConditions, NewTask, VerificationRecord, VerificationStatus};
use time::OffsetDateTime;
use time::macros::{date, datetime};

fn record(device: &str) -> VerificationRecord {
    VerificationRecord {
        id: VerificationRecord::new_id(),
        protocol_number: "1".to_string(),
        device_number: device.to_string(),
        device_type: "Амперметр".to_string(),
        device_model: "Э378".to_string(),
        lower_range: "0".to_string(),
        upper_range: "5".to_string(),
        registry_number: String::new(),
        accuracy_class: "1.5".to_string(),
        verification_date: date!(2024 - 02 - 16),
        next_verification_date: date!(2025 - 02 - 16),
        status: VerificationStatus::Pending,
        measurement_result: String::new(),
        document_paths: Vec::new(),
        point_count: 3,
        transform_function: Default::default(),
    }
}

#[test]
fn test_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("poverka.db");

    {
        let store = Store::open(&path).unwrap();
        store
            .insert_climate(
                &ClimateConditions::new("22", "40", "100.1"),
                datetime!(2024-02-16 09:00 UTC),
            )
            .unwrap();
        store
            .insert_task(&NewTask::new("Сдать отчёт", date!(2024 - 02 - 16)))
            .unwrap();
        store.save_verification(&record("E-5")).unwrap();
    }

    let store = Store::open(&path).unwrap();
    assert_eq!(store.count_climate(&ClimateQuery::new()).unwrap(), 1);
    assert_eq!(store.tasks_for_date(date!(2024 - 02 - 16)).unwrap().len(), 1);
    assert_eq!(
        store.get_verification_by_device("E-5").unwrap().unwrap().status,
        VerificationStatus::Pending
    );
}

#[test]
fn test_old_schema_is_discarded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("poverka.db");

    {
        let store = Store::open(&path).unwrap();
        store
            .insert_task(&NewTask::new("old", date!(2024 - 02 - 16)))
            .unwrap();
    }
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute(
            "UPDATE schema_version SET version = ?",
            [SCHEMA_VERSION + 1],
        )
        .unwrap();
    }

    let store = Store::open(&path).unwrap();
    assert!(store.tasks_for_date(date!(2024 - 02 - 16)).unwrap().is_empty());
}

#[tokio::test]
async fn test_store_in_blocking_task() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("poverka.db");

    let latest = tokio::task::spawn_blocking(move || {
        let store = Store::open(&path).unwrap();
        store
            .insert_climate(
                &ClimateConditions::new("21", "50", "99"),
                OffsetDateTime::now_utc(),
            )
            .unwrap();
        store.latest_climate().unwrap().map(|r| r.temperature)
    })
    .await
    .unwrap();

    assert_eq!(latest.as_deref(), Some("21"));
}
