/*!
 * Tests for the record store CRUD operations
 */

use nutrisync::database::schema::{SERVINGS_TABLE, initialize_database, servings_columns};
use nutrisync::database::{ConnectionParams, RecordSet, RecordStore, Value};
use nutrisync::errors::StoreError;

use crate::common;

const FIELDS: [&str; 3] = ["day", "weight_kg", "note"];

fn weights_store() -> RecordStore {
    let store = RecordStore::in_memory();
    store
        .run("CREATE TABLE biometrics (day TEXT NOT NULL, weight_kg FLOAT, note TEXT)")
        .unwrap();
    store
}

fn weight(day: &str, kg: f64) -> Vec<Value> {
    vec![Value::from(day), Value::from(kg), Value::Null]
}

fn file_params(dir: &std::path::Path) -> ConnectionParams {
    ConnectionParams {
        user: "postgres".to_string(),
        dbname: "nutrition".to_string(),
        password: "secret".to_string(),
        host: "localhost".to_string(),
        port: 5432,
        data_dir: Some(dir.to_path_buf()),
    }
}

#[test]
fn test_create_thenReadAll_shouldRoundTripValues() {
    let store = weights_store();
    let row = weight("2024-08-24", 81.4);

    assert!(store.create("biometrics", &FIELDS, &row).unwrap());

    let all = store.read_all("biometrics").unwrap();
    assert_eq!(all.columns, FIELDS.to_vec());
    assert_eq!(all.rows, vec![row]);
}

#[test]
fn test_readWhere_calledTwice_shouldReturnSameRows() {
    let store = weights_store();
    store.create("biometrics", &FIELDS, &weight("2024-08-24", 81.4)).unwrap();
    store.create("biometrics", &FIELDS, &weight("2024-08-25", 81.0)).unwrap();

    let first = store.read_where("biometrics", &["day"], &[Value::from("2024-08-25")]).unwrap();
    let second = store.read_where("biometrics", &["day"], &[Value::from("2024-08-25")]).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
}

#[test]
fn test_readAll_calledTwice_shouldReturnIdenticalResults() {
    let store = weights_store();
    store.create("biometrics", &FIELDS, &weight("2024-08-24", 81.4)).unwrap();
    store.create("biometrics", &FIELDS, &weight("2024-08-25", 81.0)).unwrap();

    assert_eq!(store.read_all("biometrics").unwrap(), store.read_all("biometrics").unwrap());
}

#[test]
fn test_readWhere_withNullValue_shouldMatchNullRows() {
    let store = weights_store();
    store.create("biometrics", &FIELDS, &weight("2024-08-24", 81.4)).unwrap();
    store
        .create("biometrics", &FIELDS, &[Value::from("2024-08-25"), Value::from(81.0), Value::from("fasted")])
        .unwrap();

    let found = store.read_where("biometrics", &["note"], &[Value::Null]).unwrap();
    assert_eq!(found.len(), 1);
    let record = found.records().next().unwrap();
    assert_eq!(record.get("day"), Some(&Value::from("2024-08-24")));
}

#[test]
fn test_createSameRowTwice_shouldKeepOneRow() {
    let store = weights_store();
    let row = weight("2024-08-24", 81.4);

    assert!(store.create("biometrics", &FIELDS, &row).unwrap());
    assert!(!store.create("biometrics", &FIELDS, &row).unwrap());
    assert!(!store.create("biometrics", &FIELDS, &row).unwrap());

    assert_eq!(store.read_all("biometrics").unwrap().len(), 1);
}

#[test]
fn test_update_thenReadWhere_shouldReflectNewValues() {
    let store = weights_store();
    store.create("biometrics", &FIELDS, &weight("2024-08-24", 81.4)).unwrap();

    let changed = store
        .update(
            "biometrics",
            &["day", "weight_kg", "note"],
            &[Value::from("2024-08-24"), Value::from(80.9), Value::from("corrected")],
        )
        .unwrap();
    assert_eq!(changed, 1);

    let found = store.read_where("biometrics", &["day"], &[Value::from("2024-08-24")]).unwrap();
    assert_eq!(
        found.rows[0],
        vec![Value::from("2024-08-24"), Value::Real(80.9), Value::from("corrected")]
    );
}

#[test]
fn test_update_withNoMatchingKey_shouldChangeNothing() {
    let store = weights_store();
    store.create("biometrics", &FIELDS, &weight("2024-08-24", 81.4)).unwrap();

    let changed = store
        .update("biometrics", &["day", "weight_kg"], &[Value::from("1999-01-01"), Value::from(70.0)])
        .unwrap();
    assert_eq!(changed, 0);
    assert_eq!(store.read_all("biometrics").unwrap().rows[0][1], Value::Real(81.4));
}

#[test]
fn test_delete_thenReadWhere_shouldReturnNoRows() {
    let store = weights_store();
    store.create("biometrics", &FIELDS, &weight("2024-08-24", 81.4)).unwrap();
    store.create("biometrics", &FIELDS, &weight("2024-08-25", 81.0)).unwrap();

    let deleted = store.delete("biometrics", &["day"], &[Value::from("2024-08-24")]).unwrap();
    assert_eq!(deleted, 1);
    assert!(store
        .read_where("biometrics", &["day"], &[Value::from("2024-08-24")])
        .unwrap()
        .is_empty());
    assert_eq!(store.read_all("biometrics").unwrap().len(), 1);
}

#[test]
fn test_operations_withUnknownTable_shouldReturnQueryError() {
    let store = RecordStore::in_memory();
    assert!(matches!(store.read_all("missing"), Err(StoreError::Query(_))));
    assert!(matches!(
        store.create("missing", &["a"], &[Value::from(1_i64)]),
        Err(StoreError::Query(_))
    ));
}

#[test]
fn test_hostileFieldName_shouldBeRejectedAsUnknown() {
    let store = weights_store();
    let err = store
        .read_where("biometrics", &["day\" OR 1=1 --"], &[Value::from("x")])
        .unwrap_err();
    assert!(matches!(err, StoreError::UnknownField { .. }));
}

#[test]
fn test_failedWrite_shouldNotBlockLaterWrites() {
    let store = weights_store();
    let bad = [Value::Null, Value::from(80.0), Value::Null];
    assert!(store.create("biometrics", &FIELDS, &bad).is_err());

    assert!(store.create("biometrics", &FIELDS, &weight("2024-08-24", 81.4)).unwrap());
    assert_eq!(store.read_all("biometrics").unwrap().len(), 1);
}

#[test]
fn test_fields_shouldListColumnsInOrder() {
    let store = RecordStore::in_memory();
    initialize_database(&store).unwrap();
    assert_eq!(store.fields(SERVINGS_TABLE).unwrap(), servings_columns());
    assert!(store.table_exists(SERVINGS_TABLE).unwrap());
}

#[test]
fn test_bulkInsert_shouldCountInsertedAndDuplicates() {
    let store = weights_store();
    let records = RecordSet {
        columns: FIELDS.iter().map(|f| f.to_string()).collect(),
        rows: vec![
            weight("2024-08-24", 81.4),
            weight("2024-08-25", 81.0),
            weight("2024-08-24", 81.4),
        ],
    };

    let report = store.bulk_insert("biometrics", &records).unwrap();
    assert_eq!(report.inserted, 2);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.total(), 3);
}

#[test]
fn test_bulkInsert_withUnknownColumn_shouldFailUpFront() {
    let store = weights_store();
    let records = RecordSet {
        columns: vec!["day".to_string(), "height_cm".to_string()],
        rows: vec![vec![Value::from("2024-08-24"), Value::from(180_i64)]],
    };

    assert!(matches!(
        store.bulk_insert("biometrics", &records),
        Err(StoreError::UnknownField { .. })
    ));
    assert!(store.read_all("biometrics").unwrap().is_empty());
}

#[test]
fn test_connect_withFileDatabase_shouldPersistAcrossConnections() {
    let temp_dir = common::create_temp_dir().unwrap();
    let params = file_params(temp_dir.path());

    {
        let store = RecordStore::connect(&params);
        assert!(store.is_enabled());
        store
            .run("CREATE TABLE biometrics (day TEXT NOT NULL, weight_kg FLOAT, note TEXT)")
            .unwrap();
        store.create("biometrics", &FIELDS, &weight("2024-08-24", 81.4)).unwrap();
    }

    assert!(temp_dir.path().join("nutrition.db").is_file());

    let reopened = RecordStore::connect(&params);
    assert_eq!(reopened.read_all("biometrics").unwrap().len(), 1);
}

#[test]
fn test_connect_withRemoteHost_shouldBeDisabled() {
    let temp_dir = common::create_temp_dir().unwrap();
    let mut params = file_params(temp_dir.path());
    params.host = "db.example.com".to_string();

    let store = RecordStore::connect(&params);
    assert!(!store.is_enabled());
    assert!(matches!(store.read_all("biometrics"), Err(StoreError::Disabled(_))));
}

#[test]
fn test_connect_withUnopenableFile_shouldBeDisabled() {
    let temp_dir = common::create_temp_dir().unwrap();
    let garbage = "this is not a database file. ".repeat(64);
    common::create_test_file(temp_dir.path(), "broken.db", &garbage).unwrap();
    let mut params = file_params(temp_dir.path());
    params.dbname = "broken".to_string();

    let store = RecordStore::connect(&params);
    assert!(!store.is_enabled());
}

#[test]
fn test_describe_shouldMaskPassword() {
    let params = file_params(std::path::Path::new("/tmp"));
    let description = params.describe();
    assert!(description.contains("user=postgres"));
    assert!(!description.contains("secret"));
}
