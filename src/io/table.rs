//! Table views (row sources) and record sets (result tables), both stored as
//! JSON arrays of objects.
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Error, Result};

pub type Record = IndexMap<String, Value>;

/// In-memory snapshot of a table, rows kept in file order.
#[derive(Debug, Clone, Default)]
pub struct TableView {
    pub source: PathBuf,
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl TableView {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let rows: Vec<Record> = serde_json::from_str(&text)?;
        Ok(Self::from_records(path, rows))
    }

    pub fn from_records<P: AsRef<Path>>(source: P, rows: Vec<Record>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        Self {
            source: source.as_ref().to_path_buf(),
            columns,
            rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Project every row onto `fields`, in the given order. A field missing from a
    /// single row reads as `null`; a field no row of a non-empty table has is an
    /// error.
    pub fn select(&self, fields: &[&str]) -> Result<Vec<Vec<Value>>> {
        if self.rows.is_empty() {
            return Ok(Vec::new());
        }
        for field in fields {
            if !self.columns.iter().any(|c| c == field) {
                return Err(Error::MissingField {
                    table: self.source.display().to_string(),
                    field: field.to_string(),
                });
            }
        }
        Ok(self
            .rows
            .iter()
            .map(|row| {
                fields
                    .iter()
                    .map(|f| row.get(*f).cloned().unwrap_or(Value::Null))
                    .collect()
            })
            .collect())
    }
}

/// Write records as a JSON array, replacing any existing file.
pub fn write_record_set(path: &Path, records: &[Record]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let mut writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}

pub fn read_record_set(path: &Path) -> Result<Vec<Record>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
