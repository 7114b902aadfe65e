/*!
 * Database module for the relational record store.
 *
 * This module provides SQLite-based persistence for:
 * - Connection set-up from explicit credentials
 * - Parameterized CRUD over named tables
 * - The bootstrap schema used by the ingest pipeline
 */

pub mod connection;
pub mod models;
pub mod schema;
pub mod store;

// Re-export main types
pub use connection::{ConnectionParams, DatabaseConnection};
pub use models::{BulkInsertReport, ColumnAffinity, ColumnInfo, Record, RecordSet, Value};
pub use store::RecordStore;
