/*!
 * End-to-end tests for loading CSV exports into the record store
 */

use anyhow::Result;

use nutrisync::app_config::{CategoryConfig, IngestConfig};
use nutrisync::database::schema::{SERVINGS_TABLE, initialize_database, servings_columns};
use nutrisync::database::{RecordStore, Value};
use nutrisync::ingest::{FileStatus, IngestPipeline, read_csv};

use crate::common;

fn servings_store() -> RecordStore {
    common::init_test_logging();
    let store = RecordStore::in_memory();
    initialize_database(&store).unwrap();
    store
}

#[test]
fn test_readCsv_withServingsExport_shouldMatchTableColumns() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_servings_csv(temp_dir.path(), "servings_2024.csv", 2)?;

    let set = read_csv(&path)?;
    assert_eq!(set.columns, servings_columns());
    assert_eq!(set.len(), 2);
    assert_eq!(set.rows[0][0], Value::from("2024-08-01"));
    assert_eq!(set.rows[0][4], Value::Real(0.5));
    Ok(())
}

#[test]
fn test_run_shouldLoadRoutedFilesAndReportTheRest() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path();
    common::create_servings_csv(dir, "Export_Servings_2024.csv", 3)?;
    common::create_test_file(dir, "biometrics_2024.csv", "Day,Weight (kg)\n2024-08-01,81.4\n")?;
    common::create_test_file(dir, "notes.csv", "Day,Note\n2024-08-01,rest day\n")?;
    common::create_test_file(dir, "servings.txt", "not a csv")?;

    let store = servings_store();
    let config = IngestConfig::default();
    let report = IngestPipeline::new(&store, &config).run(dir)?;

    assert_eq!(report.files.len(), 2);
    assert_eq!(report.unclassified, vec![dir.join("notes.csv")]);

    // Routing follows category order: biometrics before servings
    assert_eq!(report.files[0].table, "biometrics");
    assert!(matches!(report.files[0].status, FileStatus::Skipped(_)));
    assert_eq!(report.files[1].table, SERVINGS_TABLE);
    assert!(matches!(
        report.files[1].status,
        FileStatus::Loaded(rows) if rows.inserted == 3 && rows.failed == 0
    ));

    assert_eq!(report.loaded_files(), 1);
    assert_eq!(report.totals().inserted, 3);

    let stored = store.read_all(SERVINGS_TABLE)?;
    assert_eq!(stored.len(), 3);
    let first = stored.records().next().unwrap();
    assert_eq!(first.get("food_name"), Some(&Value::from("Food 0")));
    assert_eq!(first.get("category"), Some(&Value::from("Grains")));
    Ok(())
}

#[test]
fn test_run_twice_shouldSkipDuplicates() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_servings_csv(temp_dir.path(), "servings.csv", 4)?;

    let store = servings_store();
    let config = IngestConfig::default();
    let pipeline = IngestPipeline::new(&store, &config);

    let first = pipeline.run(temp_dir.path())?;
    assert_eq!(first.totals().inserted, 4);

    let second = pipeline.run(temp_dir.path())?;
    assert_eq!(second.totals().inserted, 0);
    assert_eq!(second.totals().duplicates, 4);
    assert_eq!(store.read_all(SERVINGS_TABLE)?.len(), 4);
    Ok(())
}

#[test]
fn test_loadFile_withExtraColumns_shouldDropThem() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "servings.csv",
        "Day,Food Name,Amount,Energy (kcal),Barcode\n2024-08-24,Oats,40 g,150,7300000000\n",
    )?;

    let store = servings_store();
    let config = IngestConfig::default();
    let rows = IngestPipeline::new(&store, &config).load_file(&path, SERVINGS_TABLE)?;
    assert_eq!(rows.inserted, 1);

    let found = store.read_where(SERVINGS_TABLE, &["food_name"], &[Value::from("Oats")])?;
    let record = found.records().next().unwrap();
    assert_eq!(record.get("energy_kcal").and_then(|v| v.as_f64()), Some(150.0));
    assert_eq!(record.get("group"), Some(&Value::Null));
    Ok(())
}

#[test]
fn test_loadFile_withNumericLookingText_shouldKeepTextColumnsVerbatim() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "servings.csv",
        "Day,Group,Food Name,Amount,Energy (kcal)\n2024-08-24,Breakfast,007,1.50,150\n",
    )?;

    let store = servings_store();
    let config = IngestConfig::default();
    let pipeline = IngestPipeline::new(&store, &config);
    assert_eq!(pipeline.load_file(&path, SERVINGS_TABLE)?.inserted, 1);

    let stored = store.read_all(SERVINGS_TABLE)?;
    let record = stored.records().next().unwrap();
    assert_eq!(record.get("food_name"), Some(&Value::from("007")));
    assert_eq!(record.get("amount"), Some(&Value::from("1.50")));
    assert_eq!(record.get("energy_kcal"), Some(&Value::Real(150.0)));

    // Typed the same way on a re-run, so the row is recognized as a duplicate
    assert_eq!(pipeline.load_file(&path, SERVINGS_TABLE)?.duplicates, 1);
    Ok(())
}

#[test]
fn test_loadFile_withMissingRequiredColumn_shouldCountFailedRows() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "servings.csv",
        "Day,Amount,Energy (kcal)\n2024-08-24,40 g,150\n2024-08-25,1 cup,210\n",
    )?;

    let store = servings_store();
    let config = IngestConfig::default();
    let rows = IngestPipeline::new(&store, &config).load_file(&path, SERVINGS_TABLE)?;

    assert_eq!(rows.inserted, 0);
    assert_eq!(rows.failed, 2);
    assert!(store.read_all(SERVINGS_TABLE)?.is_empty());
    Ok(())
}

#[test]
fn test_loadFile_atomic_withFailingRow_shouldLoadNothing() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_test_file(
        temp_dir.path(),
        "servings.csv",
        "Day,Food Name,Amount\n2024-08-24,Oats,40 g\n2024-08-25,,1 cup\n",
    )?;

    let store = servings_store();
    let config = IngestConfig {
        atomic: true,
        ..IngestConfig::default()
    };
    let result = IngestPipeline::new(&store, &config).load_file(&path, SERVINGS_TABLE);

    assert!(result.is_err());
    assert!(store.read_all(SERVINGS_TABLE)?.is_empty());
    Ok(())
}

#[test]
fn test_run_withCustomCategories_shouldRouteToConfiguredTable() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "weights.csv", "Day,Weight (kg)\n2024-08-24,81.4\n")?;

    let store = RecordStore::in_memory();
    store.run("CREATE TABLE biometrics (day TEXT NOT NULL, weight_kg FLOAT)")?;
    let config = IngestConfig {
        categories: vec![CategoryConfig::new("weights", "biometrics")],
        ..IngestConfig::default()
    };

    let report = IngestPipeline::new(&store, &config).run(temp_dir.path())?;
    assert_eq!(report.totals().inserted, 1);
    assert_eq!(
        store.read_all("biometrics")?.rows,
        vec![vec![Value::from("2024-08-24"), Value::Real(81.4)]]
    );
    Ok(())
}

#[test]
fn test_run_withDisabledStore_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let store = RecordStore::disabled("no connection");
    let config = IngestConfig::default();
    assert!(IngestPipeline::new(&store, &config).run(temp_dir.path()).is_err());
    Ok(())
}
