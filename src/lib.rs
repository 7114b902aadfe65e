/*!
 * # nutrisync - nutrition and fitness data plumbing
 *
 * A Rust library for loading nutrition tracker exports into a relational
 * store and keeping a drop folder tidy.
 *
 * ## Features
 *
 * - Normalize CSV column labels into SQL-safe identifiers
 * - Parameterized CRUD over named tables with an explicit disabled state
 * - Route CSV exports to tables by filename keyword and bulk load them
 * - Sort a watched directory into per-base-name subdirectories
 * - Fetch paginated workouts from the Hevy API
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `normalizer`: Column label normalization
 * - `database`: Record store over SQLite:
 *   - `database::connection`: Connection parameters and handle
 *   - `database::store`: CRUD operations
 *   - `database::schema`: Bootstrap tables
 * - `file_utils`: File system helpers and keyword classification
 * - `file_sorter`: Directory sweep into subdirectories
 * - `ingest`: CSV ingest pipeline
 * - `workouts`: Hevy workouts API client
 * - `app_controller`: Main application controller
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]
#![allow(non_snake_case)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod errors;
pub mod file_sorter;
pub mod file_utils;
pub mod ingest;
pub mod normalizer;
pub mod workouts;

// Re-export main types for easier usage
pub use app_config::Config;
pub use database::{RecordSet, RecordStore, Value};
pub use errors::{ApiError, AppError, SortError, StoreError};
pub use file_sorter::{FileSorter, SortReport};
pub use file_utils::{ClassifyPolicy, FileManager};
pub use ingest::{IngestPipeline, IngestReport};
pub use normalizer::normalize;
