//! Tool lifecycle: logging, parameter validation and normalization, ordered
//! execution steps and result writing.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, info_span, warn};

use crate::core::iterate::{IterationReport, Row, iterate, rows_from_parameter, rows_from_table};
use crate::core::logging::{MessageSink, log_file_path, run_dispatch};
use crate::core::params::{
    FromParameters, OUTPUT_WORKSPACE, Parameter, ParameterMessage, RESULT_TABLE_NAME, Schema,
    UNSET, find_parameter, normalize, validate_parameters,
};
use crate::core::results::{ResultTables, ResultTracker, WrittenTables};
use crate::error::{Error, Result};
use crate::io::table::Record;

/// Environment variable overriding the application data directory.
pub const HOME_ENV: &str = "GRIDGARAGE_HOME";
/// Environment variable holding the log file filter directive.
pub const LOG_ENV: &str = "GRIDGARAGE_LOG";

/// Static description of a tool, listed by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolInfo {
    pub name: &'static str,
    pub alias: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

/// A step of a tool's execution list.
pub struct Step<T: Tool> {
    pub name: &'static str,
    pub run: fn(&mut T, &mut StepContext<'_, T::Config>) -> Result<()>,
}

/// A batch tool: a parameter schema, a typed configuration built from the bound
/// parameters, and the steps run in order against that configuration.
pub trait Tool: Sized {
    type Config: FromParameters;

    const INFO: ToolInfo;

    fn schema(&self) -> Schema;

    fn steps(&self) -> Vec<Step<Self>>;

    /// Parameters handed to the config as bound objects instead of values.
    fn exclude_parameters(&self) -> &'static [&'static str] {
        &[]
    }
}

/// What a step sees of the run.
pub struct StepContext<'a, C> {
    pub config: &'a C,
    pub parameters: &'a [Parameter],
    pub results: &'a mut ResultTracker,
    pub run: &'a RunContext,
    iterations: &'a mut Vec<IterationReport>,
}

impl<C> StepContext<'_, C> {
    /// Run `worker` over the rows of a table view parameter (the first parameter
    /// when `table` is `None`).
    pub fn iterate_on_table<W>(
        &mut self,
        worker_name: &str,
        table: Option<&str>,
        nonkey_names: &[&str],
        record_results: bool,
        worker: W,
    ) -> Result<IterationReport>
    where
        W: FnMut(&Row) -> Result<Option<Record>>,
    {
        let (rows, fields) = rows_from_table(self.parameters, table, nonkey_names)?;
        let report = iterate(worker_name, worker, rows, &fields, self.results, record_results)?;
        self.iterations.push(report);
        Ok(report)
    }

    /// Run `worker` over the values of a (multi-value) parameter.
    pub fn iterate_on_parameter<W>(
        &mut self,
        worker_name: &str,
        parameter_name: &str,
        key_names: &[&str],
        record_results: bool,
        worker: W,
    ) -> Result<IterationReport>
    where
        W: FnMut(&Row) -> Result<Option<Record>>,
    {
        let (rows, fields) = rows_from_parameter(self.parameters, parameter_name, key_names)?;
        let report = iterate(worker_name, worker, rows, &fields, self.results, record_results)?;
        self.iterations.push(report);
        Ok(report)
    }
}

/// Process-level settings of the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunSettings {
    /// Where tool log files are kept
    pub app_data_dir: PathBuf,
    /// `EnvFilter` directive for the log file
    pub log_filter: String,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            app_data_dir: PathBuf::from(".gridgarage"),
            log_filter: "debug".to_string(),
        }
    }
}

impl RunSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through `lookup`, which maps an environment variable name
    /// to its value.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let app_data_dir = var(HOME_ENV)
            .map(PathBuf::from)
            .or_else(|| var("LOCALAPPDATA").map(|d| Path::new(&d).join("GridGarage")))
            .or_else(|| var("XDG_DATA_HOME").map(|d| Path::new(&d).join("gridgarage")))
            .or_else(|| {
                var("HOME").map(|h| Path::new(&h).join(".local").join("share").join("gridgarage"))
            })
            .unwrap_or_else(|| PathBuf::from(".gridgarage"));
        Self {
            app_data_dir,
            log_filter: var(LOG_ENV).unwrap_or_else(|| "debug".to_string()),
        }
    }

    pub fn with_app_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.app_data_dir = dir.into();
        self
    }
}

/// Identity of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunContext {
    pub tool_name: String,
    /// `<ToolName>_<YYYYmmdd_HHMMSS>`
    pub run_id: String,
    pub log_file: PathBuf,
}

impl RunContext {
    pub fn new(tool_name: &str, settings: &RunSettings) -> Self {
        Self {
            tool_name: tool_name.to_string(),
            run_id: format!("{}_{}", tool_name, Local::now().format("%Y%m%d_%H%M%S")),
            log_file: log_file_path(&settings.app_data_dir, tool_name),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Constructed,
    LoggingConfigured,
    ParametersBound,
    Normalized,
    Executing { step: usize, of: usize },
    ResultsWritten,
    Done,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub tool_name: String,
    pub run_id: String,
    pub log_file: PathBuf,
    pub iterations: Vec<IterationReport>,
    pub tables: Option<WrittenTables>,
}

impl RunReport {
    pub fn passed(&self) -> usize {
        self.iterations.iter().map(|r| r.passed).sum()
    }

    pub fn failed(&self) -> usize {
        self.iterations.iter().map(|r| r.failed).sum()
    }
}

pub struct ToolRunner<T: Tool> {
    tool: T,
    settings: RunSettings,
    context: RunContext,
    state: RunState,
    results: ResultTracker,
}

impl<T: Tool> ToolRunner<T> {
    pub fn new(tool: T, settings: RunSettings) -> Self {
        let context = RunContext::new(T::INFO.name, &settings);
        Self {
            tool,
            settings,
            context,
            state: RunState::Constructed,
            results: ResultTracker::new(),
        }
    }

    pub fn tool(&self) -> &T {
        &self.tool
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn results(&self) -> &ResultTracker {
        &self.results
    }

    /// Run the tool once against the bound `parameters`, reporting to `messages`
    /// and the tool's log file.
    pub fn execute(
        &mut self,
        parameters: Vec<Parameter>,
        messages: Arc<dyn MessageSink>,
    ) -> Result<RunReport> {
        if self.state != RunState::Constructed {
            return Err(Error::AlreadyExecuted);
        }
        let steps = self.tool.steps();
        if steps.is_empty() {
            return Err(Error::EmptyExecutionList);
        }

        let dispatch = run_dispatch(messages, &self.context.log_file, &self.settings.log_filter)?;
        self.state = RunState::LoggingConfigured;

        tracing::dispatcher::with_default(&dispatch, || self.run(parameters, steps))
    }

    fn run(&mut self, mut parameters: Vec<Parameter>, steps: Vec<Step<T>>) -> Result<RunReport> {
        info!("{} started ({})", T::INFO.label, self.context.run_id);
        debug!("Logging to '{}'", self.context.log_file.display());

        let config = match self.prepare(&mut parameters) {
            Ok(config) => config,
            Err(e) => {
                error!("{}", e.trace());
                self.state = RunState::Done;
                return Err(e);
            }
        };

        let of = steps.len();
        let mut iterations = Vec::new();
        for (index, step) in steps.iter().enumerate() {
            self.state = RunState::Executing { step: index + 1, of };
            let _span = info_span!("step", name = step.name).entered();
            debug!("IN {} ({} of {})", step.name, index + 1, of);

            let mut ctx = StepContext {
                config: &config,
                parameters: &parameters,
                results: &mut self.results,
                run: &self.context,
                iterations: &mut iterations,
            };
            if let Err(e) = (step.run)(&mut self.tool, &mut ctx) {
                error!("{} failed: {}", step.name, e.trace());
                if let Err(write_err) = self.results.write() {
                    warn!("Results could not be written: {}", write_err);
                }
                self.state = RunState::Done;
                return Err(e);
            }
            debug!("OUT {}", step.name);
        }

        let tables = match self.results.write() {
            Ok(tables) => tables,
            Err(e) => {
                error!("{}", e.trace());
                self.state = RunState::Done;
                return Err(e);
            }
        };
        self.state = RunState::ResultsWritten;

        let report = RunReport {
            tool_name: self.context.tool_name.clone(),
            run_id: self.context.run_id.clone(),
            log_file: self.context.log_file.clone(),
            iterations,
            tables,
        };
        info!(
            "{} finished: {} passed, {} failed",
            T::INFO.label,
            report.passed(),
            report.failed()
        );
        self.state = RunState::Done;
        Ok(report)
    }

    fn prepare(&mut self, parameters: &mut [Parameter]) -> Result<T::Config> {
        debug!("{} parameters", parameters.len());
        for p in parameters.iter() {
            debug!(
                "{} ({}) = {:?}{}",
                p.name,
                p.datatype,
                p.value,
                if p.altered { "" } else { " [default]" }
            );
        }

        let schema = self.tool.schema();
        let error_count = validate_parameters(parameters, &schema, &self.context.run_id);
        if error_count > 0 {
            let detail = parameters
                .iter()
                .filter_map(|p| match &p.message {
                    Some(ParameterMessage::Error(m)) => Some(format!("{}: {}", p.name, m)),
                    None => None,
                })
                .collect::<Vec<_>>()
                .join("; ");
            return Err(Error::InvalidParameters(detail));
        }
        self.state = RunState::ParametersBound;

        let normalized = normalize(parameters, self.tool.exclude_parameters())?;
        let config = T::Config::from_parameters(&normalized)?;
        debug!("Config {:?}", config);
        self.state = RunState::Normalized;

        self.initialise_results(parameters);
        Ok(config)
    }

    fn initialise_results(&mut self, parameters: &[Parameter]) {
        let Some(workspace) = find_parameter(parameters, OUTPUT_WORKSPACE)
            .and_then(|p| p.value_as_text())
            .filter(|w| *w != UNSET)
        else {
            debug!("No output workspace, results are not tracked");
            return;
        };
        let table_name = find_parameter(parameters, RESULT_TABLE_NAME)
            .and_then(|p| p.value_as_text())
            .filter(|n| *n != UNSET)
            .unwrap_or(self.context.run_id.as_str())
            .to_string();
        self.results.initialise(ResultTables::new(workspace, table_name));
    }
}
