/*!
 * Value and record types exchanged with the record store.
 */

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

/// A single cell value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// 64-bit signed integer
    Integer(i64),
    /// Double precision float
    Real(f64),
    /// UTF-8 text
    Text(String),
    /// Array of values, persisted as JSON text
    Array(Vec<Value>),
}

impl Value {
    /// Parse a raw tabular cell into the narrowest fitting value.
    ///
    /// Empty cells become `Null`; integers and finite floats are numeric;
    /// anything else is kept as trimmed text.
    pub fn parse_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::Null;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return Self::Integer(i);
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() => Self::Real(f),
            _ => Self::Text(trimmed.to_string()),
        }
    }

    /// Keep a raw tabular cell as text; empty cells become `Null`
    pub fn text_cell(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::Null
        } else {
            Self::Text(trimmed.to_string())
        }
    }

    /// Whether this value is SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Real(f) => Some(*f),
            _ => None,
        }
    }

    /// Text view of the value, if it is text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Integer(i) => serde_json::Value::from(*i),
            Self::Real(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Array(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
            Self::Text(s) => write!(f, "{}", s),
            Self::Array(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Self::Array(values.into_iter().map(Into::into).collect())
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
            Self::Integer(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Self::Real(f) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*f)),
            Self::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Self::Array(_) => {
                ToSqlOutput::Owned(rusqlite::types::Value::Text(self.to_json().to_string()))
            }
        })
    }
}

impl FromSql for Value {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Null => Self::Null,
            ValueRef::Integer(i) => Self::Integer(i),
            ValueRef::Real(f) => Self::Real(f),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                Self::Text(String::from_utf8_lossy(bytes).into_owned())
            }
        })
    }
}

/// Type affinity of a column, following SQLite's declared-type rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnAffinity {
    /// Declared as CHAR, CLOB or TEXT; values are stored as text
    Text,
    /// INTEGER, REAL, FLOAT, NUMERIC and anything else with a type name
    Numeric,
    /// BLOB or no declared type; values are stored as given
    Blob,
}

impl ColumnAffinity {
    pub fn from_declared_type(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("INT") {
            Self::Numeric
        } else if ["CHAR", "CLOB", "TEXT"].iter().any(|t| upper.contains(t)) {
            Self::Text
        } else if upper.trim().is_empty() || upper.contains("BLOB") {
            Self::Blob
        } else {
            Self::Numeric
        }
    }
}

/// Name and declared type of a table column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// Declared type as written in the DDL (empty when untyped)
    pub declared_type: String,
}

impl ColumnInfo {
    pub fn affinity(&self) -> ColumnAffinity {
        ColumnAffinity::from_declared_type(&self.declared_type)
    }
}

/// One row: field names paired with their values, in column order
#[derive(Debug, Clone, PartialEq)]
pub struct Record<'a> {
    fields: &'a [String],
    values: &'a [Value],
}

impl<'a> Record<'a> {
    /// Value of `field`, if the record has it
    pub fn get(&self, field: &str) -> Option<&'a Value> {
        self.fields
            .iter()
            .position(|f| f == field)
            .map(|i| &self.values[i])
    }

    /// Iterate `(field, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        let fields = self.fields;
        let values = self.values;
        fields.iter().map(String::as_str).zip(values.iter())
    }

    /// Values in column order
    pub fn values(&self) -> &'a [Value] {
        self.values
    }
}

/// Ordered column names plus rows of values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    /// Column names in order
    pub columns: Vec<String>,
    /// Row values, each aligned with `columns`
    pub rows: Vec<Vec<Value>>,
}

impl RecordSet {
    /// Create an empty set with the given columns
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the set has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Iterate rows as records
    pub fn records(&self) -> impl Iterator<Item = Record<'_>> + '_ {
        self.rows.iter().map(move |row| Record {
            fields: &self.columns,
            values: row,
        })
    }

    /// Keep only the columns accepted by `keep`, returning the dropped ones
    pub fn retain_columns<F>(&mut self, mut keep: F) -> Vec<String>
    where
        F: FnMut(&str) -> bool,
    {
        let mask: Vec<bool> = self.columns.iter().map(|c| keep(c)).collect();
        if mask.iter().all(|k| *k) {
            return Vec::new();
        }

        let mut dropped = Vec::new();
        let mut columns = Vec::with_capacity(self.columns.len());
        for (column, kept) in self.columns.drain(..).zip(&mask) {
            if *kept {
                columns.push(column);
            } else {
                dropped.push(column);
            }
        }
        self.columns = columns;

        for row in &mut self.rows {
            let mut index = 0;
            row.retain(|_| {
                let kept = mask.get(index).copied().unwrap_or(false);
                index += 1;
                kept
            });
        }

        dropped
    }
}

/// Outcome of a bulk insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkInsertReport {
    /// Rows newly inserted
    pub inserted: usize,
    /// Rows skipped because an identical row already existed
    pub duplicates: usize,
    /// Rows that failed and were rolled back
    pub failed: usize,
}

impl BulkInsertReport {
    /// Total rows attempted
    pub fn total(&self) -> usize {
        self.inserted + self.duplicates + self.failed
    }
}

impl std::ops::AddAssign for BulkInsertReport {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.failed += other.failed;
    }
}
