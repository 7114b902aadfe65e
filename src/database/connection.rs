/*!
 * Database connection management.
 *
 * This module resolves connection parameters to an SQLite database and
 * owns the single long-lived connection handle shared by the record store.
 */

use anyhow::{Context, Result, anyhow};
use log::{debug, info, warn};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::errors::StoreError;

/// Database name that selects an in-memory database
pub const IN_MEMORY_DBNAME: &str = ":memory:";

/// Default database directory name under user's data directory
const DEFAULT_DB_DIRNAME: &str = "nutrisync";

/// Default database file extension
const DEFAULT_DB_EXTENSION: &str = "db";

/// Explicit credentials used to open the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    /// User name
    pub user: String,
    /// Database name, or a path to the database file
    pub dbname: String,
    /// Password
    pub password: String,
    /// Host; must be local for the embedded engine
    pub host: String,
    /// Port
    pub port: u16,
    /// Directory that relative database names resolve against
    pub data_dir: Option<PathBuf>,
}

impl ConnectionParams {
    /// Parameters for a private in-memory database
    pub fn in_memory() -> Self {
        Self {
            user: String::new(),
            dbname: IN_MEMORY_DBNAME.to_string(),
            password: String::new(),
            host: "localhost".to_string(),
            port: 0,
            data_dir: None,
        }
    }

    /// Whether the host refers to this machine
    pub fn is_local_host(&self) -> bool {
        matches!(
            self.host.trim().to_lowercase().as_str(),
            "" | "localhost" | "127.0.0.1" | "::1"
        )
    }

    /// Credential fields that are set but have no effect on an embedded database
    pub fn ignored_credentials(&self) -> Vec<&'static str> {
        let mut ignored = Vec::new();
        if !self.user.is_empty() {
            ignored.push("user");
        }
        if !self.password.is_empty() {
            ignored.push("password");
        }
        if self.port != 0 {
            ignored.push("port");
        }
        ignored
    }

    /// Connection description with the password masked, for logging
    pub fn describe(&self) -> String {
        let password = if self.password.is_empty() { "" } else { "****" };
        format!(
            "user={} dbname={} password={} host={} port={}",
            self.user, self.dbname, password, self.host, self.port
        )
    }

    /// Resolve the database name to a file path
    pub fn database_path(&self) -> Result<PathBuf> {
        let dbname = self.dbname.trim();
        if dbname.is_empty() {
            return Err(anyhow!("Database name is empty"));
        }
        if dbname == IN_MEMORY_DBNAME {
            return Ok(PathBuf::from(IN_MEMORY_DBNAME));
        }

        let mut path = PathBuf::from(dbname);
        if path.extension().is_none() {
            path.set_extension(DEFAULT_DB_EXTENSION);
        }
        if path.is_absolute() {
            return Ok(path);
        }

        let base_dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => DatabaseConnection::default_data_dir()?,
        };
        Ok(base_dir.join(path))
    }
}

/// Database connection wrapper with thread-safe access
#[derive(Clone)]
pub struct DatabaseConnection {
    /// Path to the database file
    db_path: PathBuf,
    /// Thread-safe connection wrapped in Arc<Mutex>
    connection: Arc<Mutex<Connection>>,
}

impl DatabaseConnection {
    /// Open the database described by `params`
    pub fn open(params: &ConnectionParams) -> Result<Self> {
        if !params.is_local_host() {
            return Err(anyhow!(
                "Host '{}' is not local; the embedded engine only opens local databases",
                params.host
            ));
        }

        let ignored = params.ignored_credentials();
        if !ignored.is_empty() {
            warn!(
                "Ignoring {} for the embedded database; only dbname and data_dir select the file",
                ignored.join(", ")
            );
        }

        let db_path = params.database_path()?;
        if db_path == Path::new(IN_MEMORY_DBNAME) {
            return Self::new_in_memory();
        }
        Self::new(&db_path)
    }

    /// Create a new database connection at the specified path
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {:?}", parent)
                })?;
            }
        }

        info!("Opening database at: {:?}", db_path);

        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open database: {:?}", db_path))?;

        // Opening is lazy; touch the file so bad paths fail here
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
            .with_context(|| format!("Failed to read database: {:?}", db_path))?;

        Ok(Self {
            db_path,
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        debug!("Creating in-memory database");

        let conn = Connection::open_in_memory().context("Failed to create in-memory database")?;

        Ok(Self {
            db_path: PathBuf::from(IN_MEMORY_DBNAME),
            connection: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get the default data directory
    pub fn default_data_dir() -> Result<PathBuf> {
        // Try to use the system data directory
        let base_dir = dirs::data_local_dir()
            .or_else(dirs::data_dir)
            .or_else(|| dirs::home_dir().map(|h| h.join(".local").join("share")))
            .ok_or_else(|| anyhow!("Could not determine data directory"))?;

        Ok(base_dir.join(DEFAULT_DB_DIRNAME))
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// Execute a database operation with the connection
    ///
    /// This method acquires the mutex lock and executes the provided closure
    /// with mutable access to the connection, so the closure may open a
    /// transaction.
    pub fn execute<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError>,
    {
        let mut conn = self
            .connection
            .lock()
            .map_err(|e| StoreError::Connection(format!("Failed to acquire database lock: {}", e)))?;

        f(&mut conn)
    }
}
