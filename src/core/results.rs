//! Pass/fail bookkeeping for a run.
//!
//! A tracker starts without tables. Until [`ResultTracker::initialise`] is called,
//! records are not kept and [`ResultTracker::write`] does nothing; tools that only
//! inspect data run that way.
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;
use crate::io::table::{Record, write_record_set};

/// Where the two record sets of a run go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTables {
    pub workspace: PathBuf,
    pub table_name: String,
}

impl ResultTables {
    pub fn new(workspace: impl Into<PathBuf>, table_name: impl Into<String>) -> Self {
        Self {
            workspace: workspace.into(),
            table_name: table_name.into(),
        }
    }

    pub fn pass_path(&self) -> PathBuf {
        self.workspace.join(format!("{}_pass.json", self.table_name))
    }

    pub fn fail_path(&self) -> PathBuf {
        self.workspace.join(format!("{}_fail.json", self.table_name))
    }
}

/// Paths of the record sets produced by [`ResultTracker::write`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenTables {
    pub pass_table: PathBuf,
    pub fail_table: PathBuf,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct ResultTracker {
    tables: Option<ResultTables>,
    passes: Vec<Record>,
    fails: Vec<Record>,
}

impl ResultTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn initialise(&mut self, tables: ResultTables) {
        info!(
            "Results will be written to '{}' as '{}'",
            tables.workspace.display(),
            tables.table_name
        );
        self.tables = Some(tables);
    }

    /// Keep a pass record. Returns `false` when the tracker is not initialised.
    pub fn add_pass(&mut self, record: Record) -> bool {
        if self.tables.is_none() {
            return false;
        }
        self.passes.push(record);
        true
    }

    /// Keep a fail record. Returns `false` when the tracker is not initialised.
    pub fn add_fail(&mut self, record: Record) -> bool {
        if self.tables.is_none() {
            return false;
        }
        self.fails.push(record);
        true
    }

    pub fn passes(&self) -> &[Record] {
        &self.passes
    }

    pub fn fails(&self) -> &[Record] {
        &self.fails
    }

    /// Persist both record sets, empty ones included.
    pub fn write(&self) -> Result<Option<WrittenTables>> {
        let Some(tables) = &self.tables else {
            debug!("No result tables configured, nothing written");
            return Ok(None);
        };
        std::fs::create_dir_all(&tables.workspace)?;

        let pass_table = tables.pass_path();
        let fail_table = tables.fail_path();
        write_record_set(&pass_table, &self.passes)?;
        write_record_set(&fail_table, &self.fails)?;

        info!(
            "{} pass record(s) written to '{}'",
            self.passes.len(),
            pass_table.display()
        );
        info!(
            "{} fail record(s) written to '{}'",
            self.fails.len(),
            fail_table.display()
        );

        Ok(Some(WrittenTables {
            pass_table,
            fail_table,
            passed: self.passes.len(),
            failed: self.fails.len(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::table::read_record_set;
    use serde_json::json;

    fn record(name: &str) -> Record {
        let mut r = Record::new();
        r.insert("raster".into(), json!(name));
        r
    }

    #[test]
    fn uninitialised_tracker_ignores_records() {
        let mut tracker = ResultTracker::new();
        assert!(!tracker.add_pass(record("a")));
        assert!(!tracker.add_fail(record("b")));
        assert!(tracker.passes().is_empty());
        assert!(tracker.fails().is_empty());
        assert_eq!(tracker.write().unwrap(), None);
    }

    #[test]
    fn write_produces_both_tables_even_when_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut tracker = ResultTracker::new();
        tracker.initialise(ResultTables::new(dir.path().join("ws"), "Run_1"));
        tracker.add_pass(record("a"));
        tracker.add_pass(record("a"));

        let written = tracker.write().unwrap().unwrap();
        assert_eq!(written.passed, 2);
        assert_eq!(written.failed, 0);
        assert_eq!(written.pass_table, dir.path().join("ws").join("Run_1_pass.json"));

        let passes = read_record_set(&written.pass_table).unwrap();
        assert_eq!(passes, vec![record("a"), record("a")]);
        assert!(read_record_set(&written.fail_table).unwrap().is_empty());
    }
}
