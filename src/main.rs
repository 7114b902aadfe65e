// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use nutrisync::app_config::{self, Config};
use nutrisync::app_controller::Controller;
use nutrisync::ingest::FileStatus;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// Database credential overrides
#[derive(Args, Debug, Default)]
struct DatabaseArgs {
    /// Database user
    #[arg(long, env = "DB_USER", global = true)]
    db_user: Option<String>,

    /// Database name
    #[arg(long, env = "DB_NAME", global = true)]
    db_name: Option<String>,

    /// Database password
    #[arg(long, env = "DB_PASSWORD", global = true, hide_env_values = true)]
    db_password: Option<String>,

    /// Database host
    #[arg(long, env = "DB_HOST", global = true)]
    db_host: Option<String>,

    /// Database port
    #[arg(long, env = "DB_PORT", global = true)]
    db_port: Option<u16>,
}

impl DatabaseArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(user) = &self.db_user {
            config.database.user = user.clone();
        }
        if let Some(dbname) = &self.db_name {
            config.database.dbname = dbname.clone();
        }
        if let Some(password) = &self.db_password {
            config.database.password = password.clone();
        }
        if let Some(host) = &self.db_host {
            config.database.host = host.clone();
        }
        if let Some(port) = self.db_port {
            config.database.port = port;
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the bootstrap tables
    InitDb,

    /// Load CSV exports into the database
    Ingest {
        /// Directory with the exports (defaults to ingest.data_path)
        #[arg(value_name = "DIR", env = "DATA_PATH")]
        dir: Option<PathBuf>,

        /// Load each file in a single transaction
        #[arg(long)]
        atomic: bool,
    },

    /// Sort a directory into per-base-name subdirectories once
    Sort {
        /// Directory to sort (defaults to sorter.watch_dir)
        #[arg(value_name = "DIR", env = "WATCH_DIR")]
        dir: Option<PathBuf>,
    },

    /// Sort a directory on a fixed interval until interrupted
    Watch {
        /// Directory to sort (defaults to sorter.watch_dir)
        #[arg(value_name = "DIR", env = "WATCH_DIR")]
        dir: Option<PathBuf>,

        /// Seconds between sweeps (defaults to sorter.interval_secs)
        #[arg(long)]
        interval_secs: Option<u64>,
    },

    /// Download every workout from the Hevy API as JSON
    Workouts {
        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// API key
        #[arg(long, env = "HEVY_API_KEY", hide_env_values = true)]
        api_key: Option<String>,
    },

    /// Generate shell completions for nutrisync
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// nutrisync - nutrition and fitness data plumbing
///
/// Loads nutrition tracker CSV exports into a database, sorts a drop folder
/// by file name and downloads logged workouts.
#[derive(Parser, Debug)]
#[command(name = "nutrisync")]
#[command(version)]
#[command(about = "Nutrition and fitness data ingest tool")]
#[command(long_about = "nutrisync loads CSV exports into a database and keeps a drop folder sorted.

EXAMPLES:
    nutrisync init-db                       # Create the servings table
    nutrisync ingest ./exports              # Load every routed CSV in ./exports
    nutrisync sort /data                    # Sort /data once
    nutrisync watch /data --interval-secs 60
    nutrisync workouts -o workouts.json     # Download workouts
    nutrisync completions bash > nutrisync.bash

CONFIGURATION:
    Configuration is stored in conf.json by default. If the config file doesn't
    exist, a default one will be created automatically. Database credentials
    can be overridden with DB_USER, DB_NAME, DB_PASSWORD, DB_HOST and DB_PORT.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, default_value = "conf.json", global = true)]
    config_path: PathBuf,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,

    #[command(flatten)]
    database: DatabaseArgs,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @creates: New logger with specified level
    fn new(level: LevelFilter) -> Self {
        CustomLogger { level }
    }

    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        let logger = Box::new(CustomLogger::new(level));
        log::set_boxed_logger(logger)?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI color and tag for log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            let (color, tag) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                tag,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Accept everything here; the effective level is set after the config loads
    CustomLogger::init(LevelFilter::Trace)?;
    log::set_max_level(LevelFilter::Info);

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "nutrisync", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load_or_create(&cli.config_path)?;
    cli.database.apply(&mut config);
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }
    log::set_max_level(config.log_level.to_level_filter());

    run_command(cli.command, config).await
}

async fn run_command(command: Commands, mut config: Config) -> Result<()> {
    match command {
        Commands::InitDb => {
            Controller::with_config(config)?.init_database()?;
            info!("Database initialized");
        }
        Commands::Ingest { dir, atomic } => {
            config.ingest.atomic |= atomic;
            let controller = Controller::with_config(config)?;
            let report = controller.ingest(dir.as_deref())?;

            for outcome in &report.files {
                match &outcome.status {
                    FileStatus::Loaded(rows) => info!(
                        "{:?} -> {}: {} inserted, {} duplicate(s), {} failed",
                        outcome.path, outcome.table, rows.inserted, rows.duplicates, rows.failed
                    ),
                    FileStatus::Skipped(reason) => warn!("{:?} skipped: {}", outcome.path, reason),
                }
            }
            if report.totals().failed > 0 {
                return Err(anyhow!("{} row(s) failed to load", report.totals().failed));
            }
        }
        Commands::Sort { dir } => {
            let controller = Controller::with_config(config)?;
            let report = match dir {
                Some(dir) => controller.sort_directory(&dir)?,
                None => controller.sort_files()?,
            };
            if !report.failed.is_empty() {
                return Err(anyhow!("{} file(s) could not be moved", report.failed.len()));
            }
        }
        Commands::Watch { dir, interval_secs } => {
            if let Some(secs) = interval_secs {
                config.sorter.interval_secs = secs;
            }
            let dir = dir.unwrap_or_else(|| config.sorter.watch_dir.clone());
            let interval = Duration::from_secs(config.sorter.interval_secs);
            Controller::with_config(config)?.watch(dir, interval).await?;
        }
        Commands::Workouts { output, api_key } => {
            if let Some(key) = api_key {
                config.workouts.api_key = key;
            }
            let workouts = Controller::with_config(config)?.fetch_workouts().await?;
            let json = serde_json::to_string_pretty(&workouts).context("Failed to serialize workouts")?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
                    info!("Wrote {} workouts to {:?}", workouts.len(), path);
                }
                None => println!("{}", json),
            }
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
