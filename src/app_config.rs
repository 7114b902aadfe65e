use anyhow::{Context, Result, anyhow};
use log::warn;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::database::ConnectionParams;
use crate::normalizer::is_normalized;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Relational backend settings
    #[serde(default)]
    pub database: DatabaseConfig,

    /// CSV ingest settings
    #[serde(default)]
    pub ingest: IngestConfig,

    /// File sorter settings
    #[serde(default)]
    pub sorter: SorterConfig,

    /// Workouts API settings
    #[serde(default)]
    pub workouts: WorkoutsConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Connection credentials for the record store
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_user")]
    pub user: String,

    /// Database name; resolves to `<data_dir>/<dbname>.db`
    #[serde(default = "default_dbname")]
    pub dbname: String,

    #[serde(default = "String::new")]
    pub password: String,

    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    /// Directory for database files (defaults to the user data directory)
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            user: default_db_user(),
            dbname: default_dbname(),
            password: String::new(),
            host: default_db_host(),
            port: default_db_port(),
            data_dir: None,
        }
    }
}

impl DatabaseConfig {
    // @returns: Parameters for opening the record store
    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            user: self.user.clone(),
            dbname: self.dbname.clone(),
            password: self.password.clone(),
            host: self.host.clone(),
            port: self.port,
            data_dir: self.data_dir.clone(),
        }
    }
}

/// Keyword that routes matching files to a table
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CategoryConfig {
    // @field: Case-insensitive filename keyword
    pub keyword: String,

    // @field: Target table
    pub table: String,
}

impl CategoryConfig {
    pub fn new(keyword: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            table: table.into(),
        }
    }
}

/// CSV ingest configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IngestConfig {
    /// Directory scanned for tabular files
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// File extension to ingest
    #[serde(default = "default_extension")]
    pub extension: String,

    /// Keyword to table routing, first match wins
    #[serde(default = "default_categories")]
    pub categories: Vec<CategoryConfig>,

    /// Insert each file in a single transaction instead of row by row
    #[serde(default)]
    pub atomic: bool,

    /// Create the bootstrap tables before loading
    #[serde(default = "default_true")]
    pub initialize_schema: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            extension: default_extension(),
            categories: default_categories(),
            atomic: false,
            initialize_schema: true,
        }
    }
}

/// File sorter configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SorterConfig {
    /// Directory whose top level is sorted
    #[serde(default = "default_watch_dir")]
    pub watch_dir: PathBuf,

    /// Seconds between sweeps in watch mode
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

impl Default for SorterConfig {
    fn default() -> Self {
        Self {
            watch_dir: default_watch_dir(),
            interval_secs: default_interval_secs(),
        }
    }
}

/// Workouts API configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WorkoutsConfig {
    /// Service endpoint URL
    #[serde(default = "default_workouts_endpoint")]
    pub endpoint: String,

    /// API key for the service
    #[serde(default = "String::new")]
    pub api_key: String,

    /// Workouts requested per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WorkoutsConfig {
    fn default() -> Self {
        Self {
            endpoint: default_workouts_endpoint(),
            api_key: String::new(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_db_user() -> String {
    "postgres".to_string()
}

fn default_dbname() -> String {
    "nutrition".to_string()
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_data_path() -> PathBuf {
    PathBuf::from("./data")
}

fn default_extension() -> String {
    "csv".to_string()
}

fn default_categories() -> Vec<CategoryConfig> {
    vec![
        CategoryConfig::new("biometrics", "biometrics"),
        CategoryConfig::new("dailysummary", "dailysummary"),
        CategoryConfig::new("servings", "servings"),
    ]
}

fn default_watch_dir() -> PathBuf {
    PathBuf::from("/data")
}

fn default_interval_secs() -> u64 {
    3600 // hourly sweep
}

fn default_workouts_endpoint() -> String {
    "https://api.hevyapp.com/v1".to_string()
}

fn default_page_size() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load the configuration at `path`, writing a default one if it does not exist
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let file = File::open(path).with_context(|| format!("Failed to open config file: {:?}", path))?;
            let reader = BufReader::new(file);
            let config: Config = serde_json::from_reader(reader)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            return Ok(config);
        }

        warn!("Config file not found at {:?}, creating default config.", path);
        let config = Config::default();
        let config_json =
            serde_json::to_string_pretty(&config).context("Failed to serialize default config to JSON")?;
        std::fs::write(path, config_json)
            .with_context(|| format!("Failed to write default config to file: {:?}", path))?;
        Ok(config)
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.database.dbname.trim().is_empty() {
            return Err(anyhow!("Database name must not be empty"));
        }

        if self.ingest.extension.trim_start_matches('.').is_empty() {
            return Err(anyhow!("Ingest file extension must not be empty"));
        }
        for category in &self.ingest.categories {
            if category.keyword.is_empty() {
                return Err(anyhow!("Category keyword must not be empty (table '{}')", category.table));
            }
            if !is_normalized(&category.table) {
                return Err(anyhow!(
                    "Category table '{}' is not a normalized identifier",
                    category.table
                ));
            }
        }

        if self.sorter.interval_secs == 0 {
            return Err(anyhow!("Sorter interval must be at least one second"));
        }

        if self.workouts.page_size == 0 {
            return Err(anyhow!("Workouts page size must be at least 1"));
        }

        Ok(())
    }

    /// Validate the settings needed to call the workouts API
    pub fn validate_workouts(&self) -> Result<()> {
        if self.workouts.api_key.is_empty() {
            return Err(anyhow!("Workouts API key is required (set HEVY_API_KEY or workouts.api_key)"));
        }
        Ok(())
    }
}
