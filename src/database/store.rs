/*!
 * Record store: parameterized CRUD over named tables.
 *
 * Every statement is built from validated, quoted identifiers and bound
 * values. Writes run inside a transaction that is committed on success and
 * rolled back on failure; failures are logged with the driver diagnostics
 * and returned as [`StoreError`].
 */

use log::{debug, error, info, warn};
use rusqlite::{Connection, Transaction, params_from_iter};

use super::connection::{ConnectionParams, DatabaseConnection};
use super::models::{BulkInsertReport, ColumnInfo, RecordSet, Value};
use crate::errors::StoreError;

/// Quote an identifier for use in SQL text
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Build an AND-conjunction over `fields`, numbering placeholders from `first_index`.
///
/// Null values match with `IS NULL` and are not bound.
fn where_clause<'v, S: AsRef<str>>(
    fields: &[S],
    values: &'v [Value],
    first_index: usize,
) -> (String, Vec<&'v Value>) {
    let mut terms = Vec::with_capacity(fields.len());
    let mut bound = Vec::with_capacity(values.len());

    for (field, value) in fields.iter().zip(values) {
        let column = quote_identifier(field.as_ref());
        if value.is_null() {
            terms.push(format!("{} IS NULL", column));
        } else {
            bound.push(value);
            terms.push(format!("{} = ?{}", column, first_index + bound.len() - 1));
        }
    }

    (terms.join(" AND "), bound)
}

fn check_lengths<S: AsRef<str>>(table: &str, fields: &[S], values: &[Value]) -> Result<(), StoreError> {
    if fields.is_empty() {
        return Err(StoreError::EmptyPredicate(table.to_string()));
    }
    if fields.len() != values.len() {
        return Err(StoreError::FieldCountMismatch {
            fields: fields.len(),
            values: values.len(),
        });
    }
    Ok(())
}

enum StoreState {
    Connected(DatabaseConnection),
    Disabled(String),
}

/// CRUD access to the relational backend
pub struct RecordStore {
    state: StoreState,
}

impl RecordStore {
    /// Open the store, falling back to a disabled store if the connection fails
    pub fn connect(params: &ConnectionParams) -> Self {
        match DatabaseConnection::open(params) {
            Ok(db) => {
                info!("Database manager has connected to {}", params.dbname);
                Self::from_connection(db)
            }
            Err(e) => {
                error!("Could not connect with {}: {:#}", params.describe(), e);
                Self::disabled(format!("{:#}", e))
            }
        }
    }

    /// Wrap an already open connection
    pub fn from_connection(db: DatabaseConnection) -> Self {
        Self {
            state: StoreState::Connected(db),
        }
    }

    /// Store backed by a private in-memory database
    pub fn in_memory() -> Self {
        Self::connect(&ConnectionParams::in_memory())
    }

    /// Store that rejects every operation
    pub fn disabled(reason: impl Into<String>) -> Self {
        Self {
            state: StoreState::Disabled(reason.into()),
        }
    }

    /// Whether a connection is available
    pub fn is_enabled(&self) -> bool {
        matches!(self.state, StoreState::Connected(_))
    }

    fn connection(&self) -> Result<&DatabaseConnection, StoreError> {
        match &self.state {
            StoreState::Connected(db) => Ok(db),
            StoreState::Disabled(reason) => Err(StoreError::Disabled(reason.clone())),
        }
    }

    fn log_failure(operation: &str, table: &str, err: &StoreError) {
        error!("{} on '{}' failed: {}", operation, table, err);
        if let StoreError::Query(diag) = err {
            error!(
                "  diagnostics: code={:?} extended={:?} offset={:?}",
                diag.code, diag.extended_code, diag.offset
            );
        }
    }

    /// Run `f` inside a transaction; commit on success, roll back on failure
    fn write<T, F>(&self, operation: &str, table: &str, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
    {
        let result = self.connection().and_then(|db| {
            db.execute(|conn| {
                let tx = conn.transaction()?;
                match f(&tx) {
                    Ok(value) => {
                        tx.commit()?;
                        Ok(value)
                    }
                    Err(err) => {
                        if let Err(rollback_err) = tx.rollback() {
                            warn!("Rollback after failed {} also failed: {}", operation, rollback_err);
                        }
                        Err(err)
                    }
                }
            })
        });

        if let Err(err) = &result {
            Self::log_failure(operation, table, err);
        }
        result
    }

    fn read<T, F>(&self, operation: &str, table: &str, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let result = self
            .connection()
            .and_then(|db| db.execute(|conn| f(conn)));

        if let Err(err) = &result {
            Self::log_failure(operation, table, err);
        }
        result
    }

    fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>, StoreError> {
        let stmt = conn.prepare(&format!("SELECT * FROM {} LIMIT 0", quote_identifier(table)))?;
        Ok(stmt.column_names().into_iter().map(String::from).collect())
    }

    fn validate_fields<S: AsRef<str>>(conn: &Connection, table: &str, fields: &[S]) -> Result<(), StoreError> {
        let schema = Self::column_names(conn, table)?;
        for field in fields {
            if !schema.iter().any(|c| c == field.as_ref()) {
                return Err(StoreError::UnknownField {
                    table: table.to_string(),
                    field: field.as_ref().to_string(),
                });
            }
        }
        Ok(())
    }

    fn query_rows(conn: &Connection, sql: &str, params: &[&Value]) -> Result<RecordSet, StoreError> {
        let mut stmt = conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<Value>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(RecordSet { columns, rows })
    }

    /// Insert one row unless an identical row already exists
    fn insert_row<S: AsRef<str>>(
        conn: &Connection,
        table: &str,
        fields: &[S],
        values: &[Value],
    ) -> Result<bool, StoreError> {
        check_lengths(table, fields, values)?;
        Self::validate_fields(conn, table, fields)?;

        let (predicate, bound) = where_clause(fields, values, 1);
        let exists_sql = format!("SELECT 1 FROM {} WHERE {} LIMIT 1", quote_identifier(table), predicate);
        if conn.prepare(&exists_sql)?.exists(params_from_iter(bound.iter()))? {
            debug!("Entry already exists in '{}'. Insertion is not continued.", table);
            return Ok(false);
        }

        let columns = fields
            .iter()
            .map(|f| quote_identifier(f.as_ref()))
            .collect::<Vec<_>>()
            .join(", ");
        let placeholders = (1..=values.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_identifier(table),
            columns,
            placeholders
        );
        conn.execute(&sql, params_from_iter(values.iter()))?;
        Ok(true)
    }

    /// Insert one row.
    ///
    /// Returns `Ok(false)` without inserting when a row with the same
    /// field values already exists.
    pub fn create<S: AsRef<str>>(&self, table: &str, fields: &[S], values: &[Value]) -> Result<bool, StoreError> {
        let inserted = self.write("create", table, |tx| Self::insert_row(tx, table, fields, values))?;
        if inserted {
            debug!("Entry insertion into '{}' complete", table);
        } else {
            info!("Entry already exists in '{}'. Insertion is not continued.", table);
        }
        Ok(inserted)
    }

    /// Every row of `table` with its column order
    pub fn read_all(&self, table: &str) -> Result<RecordSet, StoreError> {
        let set = self.read("read_all", table, |conn| {
            let sql = format!("SELECT * FROM {}", quote_identifier(table));
            Self::query_rows(conn, &sql, &[])
        })?;
        info!("Fetched {} entries from {}", set.len(), table);
        Ok(set)
    }

    /// Rows where every field equals its paired value
    pub fn read_where<S: AsRef<str>>(&self, table: &str, fields: &[S], values: &[Value]) -> Result<RecordSet, StoreError> {
        let set = self.read("read_where", table, |conn| {
            check_lengths(table, fields, values)?;
            Self::validate_fields(conn, table, fields)?;
            let (predicate, bound) = where_clause(fields, values, 1);
            let sql = format!("SELECT * FROM {} WHERE {}", quote_identifier(table), predicate);
            Self::query_rows(conn, &sql, &bound)
        })?;
        info!("Fetched {} entries from {}", set.len(), table);
        Ok(set)
    }

    /// Update rows matching `fields[0] = new_row[0]`, setting the remaining fields.
    ///
    /// Returns the number of rows changed.
    pub fn update<S: AsRef<str>>(&self, table: &str, fields: &[S], new_row: &[Value]) -> Result<usize, StoreError> {
        let changed = self.write("update", table, |tx| {
            check_lengths(table, fields, new_row)?;
            if fields.len() < 2 {
                return Err(StoreError::EmptyPredicate(table.to_string()));
            }
            Self::validate_fields(tx, table, fields)?;

            let set_clause = fields[1..]
                .iter()
                .enumerate()
                .map(|(i, f)| format!("{} = ?{}", quote_identifier(f.as_ref()), i + 1))
                .collect::<Vec<_>>()
                .join(", ");
            let (predicate, key) = where_clause(&fields[..1], &new_row[..1], new_row.len());
            let sql = format!(
                "UPDATE {} SET {} WHERE {}",
                quote_identifier(table),
                set_clause,
                predicate
            );

            let params = new_row[1..].iter().chain(key);
            Ok(tx.execute(&sql, params_from_iter(params))?)
        })?;

        info!("{} updated to new values ({} row(s) in '{}')", new_row[0], changed, table);
        Ok(changed)
    }

    /// Delete every row matching the AND-conjunction of `fields = values`
    pub fn delete<S: AsRef<str>>(&self, table: &str, fields: &[S], values: &[Value]) -> Result<usize, StoreError> {
        let deleted = self.write("delete", table, |tx| {
            check_lengths(table, fields, values)?;
            Self::validate_fields(tx, table, fields)?;
            let (predicate, bound) = where_clause(fields, values, 1);
            let sql = format!("DELETE FROM {} WHERE {}", quote_identifier(table), predicate);
            Ok(tx.execute(&sql, params_from_iter(bound.iter()))?)
        })?;
        info!("Deleted {} row(s) from {}", deleted, table);
        Ok(deleted)
    }

    /// Ordered column names of `table`, read without fetching rows
    pub fn fields(&self, table: &str) -> Result<Vec<String>, StoreError> {
        self.read("fields", table, |conn| Self::column_names(conn, table))
    }

    /// Column names and declared types of `table`, in order
    pub fn column_types(&self, table: &str) -> Result<Vec<ColumnInfo>, StoreError> {
        self.read("column_types", table, |conn| {
            let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_identifier(table)))?;
            let columns = stmt
                .query_map([], |row| {
                    Ok(ColumnInfo {
                        name: row.get(1)?,
                        declared_type: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    })
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(columns)
        })
    }

    /// Whether `table` exists
    pub fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        self.read("table_exists", table, |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
                [table],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    /// Insert every row of `records` with one `create` per row.
    ///
    /// Rows commit independently: a failing row is logged, counted and
    /// absent, and the remaining rows are still attempted.
    pub fn bulk_insert(&self, table: &str, records: &RecordSet) -> Result<BulkInsertReport, StoreError> {
        self.read("bulk_insert", table, |conn| Self::validate_fields(conn, table, &records.columns))?;

        info!("Inserting {} to {}", records.len(), table);
        let mut report = BulkInsertReport::default();
        for row in &records.rows {
            match self.create(table, &records.columns, row) {
                Ok(true) => report.inserted += 1,
                Ok(false) => report.duplicates += 1,
                Err(_) => report.failed += 1,
            }
        }

        info!(
            "Insertion to {} complete: {} inserted, {} duplicate(s), {} failed",
            table, report.inserted, report.duplicates, report.failed
        );
        Ok(report)
    }

    /// Insert every row of `records` in a single transaction.
    ///
    /// Any failing row rolls back the whole batch.
    pub fn bulk_insert_atomic(&self, table: &str, records: &RecordSet) -> Result<BulkInsertReport, StoreError> {
        info!("Inserting {} to {} atomically", records.len(), table);
        let report = self.write("bulk_insert_atomic", table, |tx| {
            let mut report = BulkInsertReport::default();
            for row in &records.rows {
                if Self::insert_row(tx, table, &records.columns, row)? {
                    report.inserted += 1;
                } else {
                    report.duplicates += 1;
                }
            }
            Ok(report)
        })?;
        info!(
            "Atomic insertion to {} complete: {} inserted, {} duplicate(s)",
            table, report.inserted, report.duplicates
        );
        Ok(report)
    }

    /// Execute arbitrary statement(s) and commit
    pub fn run(&self, query: &str) -> Result<(), StoreError> {
        self.write("run", "-", |tx| Ok(tx.execute_batch(query)?))?;
        debug!("Query executed");
        Ok(())
    }
}
