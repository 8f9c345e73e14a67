//! Crate-level error type and `Result` alias for stable, structured error handling.
//! Converts underlying I/O, JSON and geodata errors, and provides semantic variants
//! for configuration mistakes, parameter coercion and tool processing failures.
use thiserror::Error;

use crate::types::ParameterType;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Geodata error: {0}")]
    Geodata(#[from] crate::io::GeodataError),

    #[error("Tool execution list is empty")]
    EmptyExecutionList,

    #[error("Tool run has already been executed")]
    AlreadyExecuted,

    #[error("Parameter '{name}' not found")]
    ParameterNotFound { name: String },

    #[error("Parameter '{name}' is not a {expected} value")]
    ParameterType { name: String, expected: &'static str },

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Could not convert '{value}' to {datatype} for parameter '{name}'")]
    ValueCoercion {
        name: String,
        datatype: ParameterType,
        value: String,
    },

    #[error("No values or records to process.")]
    NoRows,

    #[error("That parameter is not a table or table view ({name})")]
    NotATableView { name: String },

    #[error("Multi-value tableview iteration is not yet implemented")]
    MultiValueTableView,

    #[error("Parameter '{name}' is a table view, iterate it as a table")]
    UnexpectedTableView { name: String },

    #[error("Field '{field}' not found in table '{table}'")]
    MissingField { table: String, field: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid argument: {arg}={value}")]
    InvalidArgument { arg: &'static str, value: String },

    #[error("Processing error: {0}")]
    Processing(String),
}

impl Error {
    /// True for mistakes in how a tool or its inputs were put together, as opposed
    /// to failures that happen while data is being processed.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::EmptyExecutionList
                | Error::AlreadyExecuted
                | Error::ParameterNotFound { .. }
                | Error::ParameterType { .. }
                | Error::InvalidParameters(_)
                | Error::NoRows
                | Error::NotATableView { .. }
                | Error::MultiValueTableView
                | Error::UnexpectedTableView { .. }
                | Error::MissingField { .. }
                | Error::UnknownTool(_)
                | Error::InvalidArgument { .. }
        )
    }

    /// Render the error with its `source()` chain, one cause per line.
    pub fn trace(&self) -> String {
        let mut out = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            out.push_str("\n\tcaused by: ");
            out.push_str(&cause.to_string());
            source = cause.source();
        }
        out
    }
}
