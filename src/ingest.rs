/*!
 * CSV ingest pipeline.
 *
 * Files in the data directory are routed to tables by keyword, their
 * headers are normalized, unknown columns are dropped and the rows are
 * inserted through the record store.
 */

use anyhow::{Context, Result, anyhow};
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::app_config::IngestConfig;
use crate::database::{BulkInsertReport, ColumnAffinity, ColumnInfo, RecordSet, RecordStore, Value};
use crate::file_utils::{ClassifyPolicy, FileManager};
use crate::normalizer::normalize_columns;

/// Result of loading one file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Rows were inserted (or skipped as duplicates)
    Loaded(BulkInsertReport),
    /// The file was not loaded
    Skipped(String),
}

/// Outcome for one routed file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub table: String,
    pub status: FileStatus,
}

/// Outcome of an ingest run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Per-file outcomes, in routing order
    pub files: Vec<FileOutcome>,
    /// Files that matched no category
    pub unclassified: Vec<PathBuf>,
}

impl IngestReport {
    /// Row counts summed over every loaded file
    pub fn totals(&self) -> BulkInsertReport {
        let mut totals = BulkInsertReport::default();
        for outcome in &self.files {
            if let FileStatus::Loaded(report) = &outcome.status {
                totals += *report;
            }
        }
        totals
    }

    /// Number of files that were loaded
    pub fn loaded_files(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Loaded(_)))
            .count()
    }
}

/// Read a CSV file into a record set with normalized column names.
///
/// Each cell gets the narrowest type its own text allows. Rows whose width
/// differs from the header are logged and skipped.
pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<RecordSet> {
    read_csv_with(path.as_ref(), Value::parse_cell)
}

/// Read a CSV file keeping every non-empty cell as text
pub fn read_csv_text<P: AsRef<Path>>(path: P) -> Result<RecordSet> {
    read_csv_with(path.as_ref(), Value::text_cell)
}

/// Convert text cells of non-text columns to numbers where they parse
fn apply_column_types(set: &mut RecordSet, schema: &[ColumnInfo]) {
    let affinities: Vec<ColumnAffinity> = set
        .columns
        .iter()
        .map(|c| {
            schema
                .iter()
                .find(|s| s.name == *c)
                .map_or(ColumnAffinity::Blob, ColumnInfo::affinity)
        })
        .collect();

    for row in &mut set.rows {
        for (value, affinity) in row.iter_mut().zip(&affinities) {
            if *affinity == ColumnAffinity::Text {
                continue;
            }
            let typed = match value {
                Value::Text(raw) => Value::parse_cell(raw),
                _ => continue,
            };
            *value = typed;
        }
    }
}

fn read_csv_with(path: &Path, parse: fn(&str) -> Value) -> Result<RecordSet> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read CSV header: {:?}", path))?
        .iter()
        .map(String::from)
        .collect();
    if headers.is_empty() {
        return Err(anyhow!("CSV file has no header: {:?}", path));
    }

    let mut set = RecordSet::new(normalize_columns(&headers));
    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("Skipping unreadable row {} in {:?}: {}", line + 2, path, e);
                continue;
            }
        };
        if record.len() != set.columns.len() {
            warn!(
                "Skipping row {} in {:?}: expected {} fields, found {}",
                line + 2,
                path,
                set.columns.len(),
                record.len()
            );
            continue;
        }
        set.rows.push(record.iter().map(parse).collect());
    }

    Ok(set)
}

/// Loads tabular files into the record store
pub struct IngestPipeline<'a> {
    store: &'a RecordStore,
    config: &'a IngestConfig,
}

impl<'a> IngestPipeline<'a> {
    pub fn new(store: &'a RecordStore, config: &'a IngestConfig) -> Self {
        Self { store, config }
    }

    /// Files in `dir` grouped by target table
    pub fn route<P: AsRef<Path>>(&self, dir: P) -> Result<(Vec<(String, PathBuf)>, Vec<PathBuf>)> {
        let dir = dir.as_ref();
        let files = FileManager::find_files(dir, &self.config.extension)
            .with_context(|| format!("Failed to list data directory: {:?}", dir))?;
        info!("Found {} .{} file(s) in {:?}", files.len(), self.config.extension, dir);

        let keywords: Vec<&str> = self.config.categories.iter().map(|c| c.keyword.as_str()).collect();
        let mut categories = FileManager::classify_with(&files, &keywords, ClassifyPolicy::FirstMatch);

        let mut routed = Vec::new();
        for category in &self.config.categories {
            if let Some(paths) = categories.remove(&category.keyword) {
                routed.extend(paths.into_iter().map(|p| (category.table.clone(), p)));
            }
        }

        let unclassified = files
            .into_iter()
            .filter(|f| !routed.iter().any(|(_, p)| p == f))
            .collect();

        Ok((routed, unclassified))
    }

    /// Load every routed file found in `dir`
    pub fn run<P: AsRef<Path>>(&self, dir: P) -> Result<IngestReport> {
        if !self.store.is_enabled() {
            return Err(anyhow!("Record store is not connected; ingest aborted"));
        }

        let (routed, unclassified) = self.route(dir)?;
        for path in &unclassified {
            warn!("No category matches {:?}; file left untouched", path);
        }

        let mut report = IngestReport {
            files: Vec::with_capacity(routed.len()),
            unclassified,
        };

        for (table, path) in routed {
            let status = match self.load_file(&path, &table) {
                Ok(rows) => FileStatus::Loaded(rows),
                Err(e) => {
                    warn!("Skipping {:?}: {:#}", path, e);
                    FileStatus::Skipped(format!("{:#}", e))
                }
            };
            report.files.push(FileOutcome { path, table, status });
        }

        let totals = report.totals();
        info!(
            "Ingest complete: {} file(s) loaded, {} row(s) inserted, {} duplicate(s), {} failed",
            report.loaded_files(),
            totals.inserted,
            totals.duplicates,
            totals.failed
        );
        Ok(report)
    }

    /// Load one file into `table`
    pub fn load_file(&self, path: &Path, table: &str) -> Result<BulkInsertReport> {
        if !self.store.table_exists(table)? {
            return Err(anyhow!("Table '{}' does not exist", table));
        }
        let schema = self.store.column_types(table)?;

        // Cells start as text and are typed by the column they land in
        let mut set = read_csv_text(path)?;
        let dropped = set.retain_columns(|c| schema.iter().any(|s| s.name == c));
        if !dropped.is_empty() {
            warn!(
                "{:?}: {} column(s) not in table '{}': {}",
                path,
                dropped.len(),
                table,
                dropped.join(", ")
            );
        }
        if set.columns.is_empty() {
            return Err(anyhow!("No column of {:?} matches table '{}'", path, table));
        }

        apply_column_types(&mut set, &schema);

        info!("Loading {} row(s) from {:?} into '{}'", set.len(), path, table);
        let report = if self.config.atomic {
            self.store.bulk_insert_atomic(table, &set)?
        } else {
            self.store.bulk_insert(table, &set)?
        };
        Ok(report)
    }
}
