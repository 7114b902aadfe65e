/*!
 * Error types for the nutrisync application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::path::PathBuf;

use thiserror::Error;

/// Driver-reported diagnostic fields attached to a failed statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Primary error code name reported by the engine (e.g. `ConstraintViolation`)
    pub code: Option<String>,
    /// Extended numeric result code
    pub extended_code: Option<i32>,
    /// Error message reported by the engine
    pub message: String,
    /// Byte offset into the SQL text where the error was detected
    pub offset: Option<i32>,
}

impl Diagnostics {
    /// Build diagnostics from a rusqlite error
    pub fn from_sqlite(error: &rusqlite::Error) -> Self {
        match error {
            rusqlite::Error::SqliteFailure(ffi_error, message) => Self {
                code: Some(format!("{:?}", ffi_error.code)),
                extended_code: Some(ffi_error.extended_code),
                message: message.clone().unwrap_or_else(|| ffi_error.to_string()),
                offset: None,
            },
            rusqlite::Error::SqlInputError { error, msg, offset, .. } => Self {
                code: Some(format!("{:?}", error.code)),
                extended_code: Some(error.extended_code),
                message: msg.clone(),
                offset: Some(*offset),
            },
            other => Self {
                code: None,
                extended_code: None,
                message: other.to_string(),
                offset: None,
            },
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(code) = &self.code {
            write!(f, " (code: {}", code)?;
            if let Some(extended) = self.extended_code {
                write!(f, ", extended: {}", extended)?;
            }
            write!(f, ")")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " at offset {}", offset)?;
        }
        Ok(())
    }
}

/// Errors returned by the record store
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store never established a connection
    #[error("Record store is disabled: {0}")]
    Disabled(String),

    /// Opening the backend failed
    #[error("Connection error: {0}")]
    Connection(String),

    /// A statement failed and its transaction was rolled back
    #[error("Query failed: {0}")]
    Query(Diagnostics),

    /// A field name is not part of the table's schema
    #[error("Unknown field `{field}` for table `{table}`")]
    UnknownField {
        /// Table that was addressed
        table: String,
        /// Offending field name
        field: String,
    },

    /// Fields and values have different lengths
    #[error("Field count mismatch: {fields} fields but {values} values")]
    FieldCountMismatch {
        /// Number of field names supplied
        fields: usize,
        /// Number of values supplied
        values: usize,
    },

    /// A predicate or update needs at least one field
    #[error("Operation on `{0}` requires at least one field")]
    EmptyPredicate(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Query(Diagnostics::from_sqlite(&error))
    }
}

/// Errors that stop a whole directory sweep
#[derive(Error, Debug)]
pub enum SortError {
    /// The directory to sort does not exist
    #[error("Folder does not exist: {0:?}")]
    MissingDirectory(PathBuf),

    /// Listing the directory failed
    #[error("Failed to list {path:?}: {source}")]
    Io {
        /// Directory being listed
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur when talking to the workouts API
#[derive(Error, Debug)]
pub enum ApiError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from the record store
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Error from the file sorter
    #[error("Sort error: {0}")]
    Sort(#[from] SortError),

    /// Error from the workouts API
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
