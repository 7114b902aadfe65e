use anyhow::{Context, Result, anyhow};
use log::{error, info};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_config::Config;
use crate::database::RecordStore;
use crate::database::schema::initialize_database;
use crate::file_sorter::{FileSorter, SortReport};
use crate::ingest::{IngestPipeline, IngestReport};
use crate::workouts::{HevyClient, Workout, fetch_all_workouts};

// @module: Application controller binding configuration to the pipelines

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    /// Create a new controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        Self::with_config(Config::default())
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open the record store from the configured credentials
    pub fn connect_store(&self) -> RecordStore {
        RecordStore::connect(&self.config.database.connection_params())
    }

    /// Create the bootstrap tables
    pub fn init_database(&self) -> Result<()> {
        let store = self.connect_store();
        initialize_database(&store).context("Failed to initialize database schema")?;
        Ok(())
    }

    /// Ingest every routed file of `dir` (or the configured data path)
    pub fn ingest(&self, dir: Option<&Path>) -> Result<IngestReport> {
        let store = self.connect_store();
        if !store.is_enabled() {
            return Err(anyhow!("Could not connect to database '{}'", self.config.database.dbname));
        }
        self.ingest_with_store(&store, dir)
    }

    /// Ingest using an already open store
    pub fn ingest_with_store(&self, store: &RecordStore, dir: Option<&Path>) -> Result<IngestReport> {
        if self.config.ingest.initialize_schema {
            initialize_database(store).context("Failed to initialize database schema")?;
        }

        let dir = dir.unwrap_or(self.config.ingest.data_path.as_path());
        IngestPipeline::new(store, &self.config.ingest).run(dir)
    }

    /// Sort the configured watch directory once
    pub fn sort_files(&self) -> Result<SortReport> {
        self.sort_directory(&self.config.sorter.watch_dir)
    }

    /// Sort `dir` once
    pub fn sort_directory(&self, dir: &Path) -> Result<SortReport> {
        Ok(FileSorter::new(dir).sort_into_subdirectories()?)
    }

    /// Sort `dir` every `interval` until Ctrl-C
    pub async fn watch(&self, dir: PathBuf, interval: Duration) -> Result<()> {
        info!("Sorting {:?} every {}s (Ctrl-C to stop)", dir, interval.as_secs());
        let sorter = FileSorter::new(dir);
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = sorter.sort_into_subdirectories() {
                        error!("Sort run failed: {}", e);
                    }
                }
                signal = tokio::signal::ctrl_c() => {
                    signal.context("Failed to listen for Ctrl-C")?;
                    info!("Stopping watch on {:?}", sorter.root());
                    return Ok(());
                }
            }
        }
    }

    /// Fetch every workout from the configured API
    pub async fn fetch_workouts(&self) -> Result<Vec<Workout>> {
        self.config.validate_workouts()?;
        let workouts = &self.config.workouts;
        let client = HevyClient::new(
            workouts.api_key.clone(),
            workouts.endpoint.clone(),
            workouts.page_size,
            workouts.timeout_secs,
        );
        Ok(fetch_all_workouts(&client).await?)
    }
}
