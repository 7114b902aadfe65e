/*!
 * Full app lifecycle tests from configuration to stored rows
 */

use anyhow::Result;
use std::path::Path;

use nutrisync::app_config::Config;
use nutrisync::app_controller::Controller;
use nutrisync::database::schema::SERVINGS_TABLE;

use crate::common;

fn config_for(dir: &Path) -> Config {
    let mut config = Config::default();
    config.database.data_dir = Some(dir.join("db"));
    config.ingest.data_path = dir.join("exports");
    config.sorter.watch_dir = dir.join("inbox");
    config
}

#[test]
fn test_controller_withDefaultConfig_shouldBeCreated() -> Result<()> {
    let controller = Controller::new_for_test()?;
    assert_eq!(controller.config().database.dbname, "nutrition");
    Ok(())
}

#[test]
fn test_controller_withInvalidConfig_shouldBeRejected() {
    let mut config = Config::default();
    config.sorter.interval_secs = 0;
    assert!(Controller::with_config(config).is_err());
}

#[test]
fn test_initDatabase_shouldCreateServingsTableOnDisk() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_config(config_for(temp_dir.path()))?;

    controller.init_database()?;

    assert!(temp_dir.path().join("db").join("nutrition.db").is_file());
    let store = controller.connect_store();
    assert!(store.table_exists(SERVINGS_TABLE)?);
    Ok(())
}

#[test]
fn test_ingest_fromConfiguredDataPath_shouldPersistRows() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let exports = temp_dir.path().join("exports");
    std::fs::create_dir_all(&exports)?;
    common::create_servings_csv(&exports, "servings.csv", 5)?;

    let controller = Controller::with_config(config_for(temp_dir.path()))?;
    let report = controller.ingest(None)?;
    assert_eq!(report.totals().inserted, 5);

    // A fresh connection sees the committed rows
    let store = controller.connect_store();
    assert_eq!(store.read_all(SERVINGS_TABLE)?.len(), 5);
    Ok(())
}

#[test]
fn test_ingest_withRemoteHost_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let mut config = config_for(temp_dir.path());
    config.database.host = "db.example.com".to_string();

    let controller = Controller::with_config(config)?;
    assert!(controller.ingest(Some(temp_dir.path())).is_err());
    Ok(())
}

#[test]
fn test_sortFiles_shouldSortConfiguredWatchDir() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let inbox = temp_dir.path().join("inbox");
    std::fs::create_dir_all(&inbox)?;
    common::create_test_file(&inbox, "scan_001.pdf", "%PDF")?;

    let controller = Controller::with_config(config_for(temp_dir.path()))?;
    let report = controller.sort_files()?;

    assert_eq!(report.moved.len(), 1);
    assert!(inbox.join("scan_001").join("scan_001.pdf").is_file());
    Ok(())
}

#[test]
fn test_sortFiles_withMissingWatchDir_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_config(config_for(temp_dir.path()))?;
    assert!(controller.sort_files().is_err());
    Ok(())
}

#[tokio::test]
async fn test_fetchWorkouts_withoutApiKey_shouldFailBeforeAnyRequest() -> Result<()> {
    let controller = Controller::new_for_test()?;
    assert!(controller.fetch_workouts().await.is_err());
    Ok(())
}
