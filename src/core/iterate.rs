//! Row iteration with per-row error isolation.
//!
//! Rows come from a table view or from the values of a (multi-value) parameter.
//! Each row is handed to a worker; a worker error is logged and the row recorded
//! as a fail, and iteration carries on with the next row. A batch of N rows
//! always yields N outcomes.
use chrono::Local;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, info_span};

use crate::core::params::{MULTI_VALUE_DELIMITER, Parameter, get_parameter};
use crate::core::results::ResultTracker;
use crate::error::{Error, Result};
use crate::io::table::{Record, TableView};
use crate::types::ParameterType;

/// One row as a worker sees it: alias -> raw value.
pub type Row = IndexMap<String, Value>;

/// Alias -> source field name, fixed for the whole iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    entries: IndexMap<String, String>,
}

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every name maps to itself.
    pub fn identity<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut map = Self::new();
        for name in names {
            let name = name.into();
            map.insert(name.clone(), name);
        }
        map
    }

    pub fn insert(&mut self, alias: impl Into<String>, field: impl Into<String>) {
        self.entries.insert(alias.into(), field.into());
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Raw row values before they are paired with aliases.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRow {
    Scalar(Value),
    Tuple(Vec<Value>),
}

impl RawRow {
    /// Scalars become one-element tuples so both shapes zip the same way.
    pub fn into_values(self) -> Vec<Value> {
        match self {
            RawRow::Scalar(v) => vec![v],
            RawRow::Tuple(values) => values,
        }
    }
}

impl From<Value> for RawRow {
    fn from(value: Value) -> Self {
        match value {
            Value::Array(values) => RawRow::Tuple(values),
            other => RawRow::Scalar(other),
        }
    }
}

impl From<&str> for RawRow {
    fn from(value: &str) -> Self {
        RawRow::Scalar(Value::String(value.to_string()))
    }
}

impl From<String> for RawRow {
    fn from(value: String) -> Self {
        RawRow::Scalar(Value::String(value))
    }
}

impl From<Vec<Value>> for RawRow {
    fn from(values: Vec<Value>) -> Self {
        RawRow::Tuple(values)
    }
}

/// Outcome counts of one iteration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationReport {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    /// Rows whose outcome could not be recorded (no result tables configured)
    pub untracked: usize,
}

/// Pair each alias with the row value at the same position.
pub fn zip_row(fields: &FieldMap, raw: RawRow) -> Row {
    fields
        .aliases()
        .map(str::to_string)
        .zip(raw.into_values())
        .collect()
}

/// Run `worker` once per row.
///
/// Worker errors never stop the loop: the row is logged and recorded as a fail.
/// When `record_results` is set, a successful row is recorded as a pass using the
/// worker's record, or the input row when the worker returns `None`.
///
/// Fails with [`Error::NoRows`] when `rows` is empty.
pub fn iterate<W>(
    worker_name: &str,
    mut worker: W,
    rows: Vec<RawRow>,
    fields: &FieldMap,
    results: &mut ResultTracker,
    record_results: bool,
) -> Result<IterationReport>
where
    W: FnMut(&Row) -> Result<Option<Record>>,
{
    if rows.is_empty() {
        return Err(Error::NoRows);
    }

    let rows: Vec<Row> = rows.into_iter().map(|raw| zip_row(fields, raw)).collect();
    let total = rows.len();
    let mut report = IterationReport {
        total,
        ..Default::default()
    };

    info!("{} items to process", total);

    for (row_num, row) in rows.into_iter().enumerate().map(|(i, r)| (i + 1, r)) {
        let _span = info_span!("row", worker = worker_name, row = row_num).entered();
        info!(
            "{} > Processing row {} of {}",
            Local::now().format("%H:%M:%S%.3f"),
            row_num,
            total
        );
        debug!("Running {} with row={:?}", worker_name, row);

        match worker(&row) {
            Ok(output) => {
                report.passed += 1;
                if record_results {
                    let record = output.unwrap_or_else(|| row.clone());
                    if !results.add_pass(record) {
                        report.untracked += 1;
                        debug!("No result tables configured, pass for row {} not kept", row_num);
                    }
                }
            }
            Err(e) => {
                report.failed += 1;
                error!("error executing {}: {}", worker_name, e);
                if !results.add_fail(row) {
                    report.untracked += 1;
                    debug!("No result tables configured, fail for row {} not kept", row_num);
                }
            }
        }
    }

    info!(
        "{} finished: {} passed, {} failed of {}",
        worker_name, report.passed, report.failed, report.total
    );
    Ok(report)
}

/// Rows of the table view parameter `table` (the first parameter when `None`).
///
/// Fields are the parameters depending on the table whose value is set and not
/// `NONE` (alias = parameter name, field = its value), followed by `nonkey_names`
/// mapped to themselves.
pub fn rows_from_table(
    parameters: &[Parameter],
    table: Option<&str>,
    nonkey_names: &[&str],
) -> Result<(Vec<RawRow>, FieldMap)> {
    let param = match table {
        Some(name) => get_parameter(parameters, name)?,
        None => parameters.first().ok_or_else(|| Error::ParameterNotFound {
            name: "<table view>".to_string(),
        })?,
    };

    if param.datatype != ParameterType::TableView {
        return Err(Error::NotATableView {
            name: param.name.clone(),
        });
    }
    if param.multi_value {
        return Err(Error::MultiValueTableView);
    }

    let mut fields = FieldMap::new();
    for p in parameters.iter().filter(|p| p.dependencies.contains(&param.name)) {
        match p.value_as_text() {
            Some(field) if field != "NONE" => fields.insert(p.name.clone(), field),
            _ => {}
        }
    }
    for name in nonkey_names {
        fields.insert(*name, *name);
    }
    debug!("Table fields {:?}", fields);

    let source = param.value_as_text().ok_or_else(|| {
        Error::InvalidParameters(format!("table view '{}' has no value", param.name))
    })?;
    let view = TableView::open(source)?;
    let selected: Vec<&str> = fields.fields().collect();
    let rows = view
        .select(&selected)?
        .into_iter()
        .map(RawRow::Tuple)
        .collect();

    Ok((rows, fields))
}

/// Rows from the value of a non-table parameter: one per `;`-separated value when
/// the parameter is multi-value, otherwise a single row.
pub fn rows_from_parameter(
    parameters: &[Parameter],
    parameter_name: &str,
    key_names: &[&str],
) -> Result<(Vec<RawRow>, FieldMap)> {
    let param = get_parameter(parameters, parameter_name)?;
    debug!("multiValue attribute is {}", param.multi_value);

    if param.datatype == ParameterType::TableView {
        return Err(Error::UnexpectedTableView {
            name: param.name.clone(),
        });
    }

    let text = param.value.clone().unwrap_or_default();
    let rows: Vec<RawRow> = if param.multi_value {
        text.split(MULTI_VALUE_DELIMITER)
            .filter(|v| !v.is_empty())
            .map(RawRow::from)
            .collect()
    } else if text.is_empty() {
        Vec::new()
    } else {
        vec![RawRow::from(text)]
    };
    debug!("Processing rows will be {:?}", rows);

    Ok((rows, FieldMap::identity(key_names.iter().copied())))
}
