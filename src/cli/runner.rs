use std::fs;
use std::path::Path;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, info};

use gridgarage::core::logging::ConsoleMessages;
use gridgarage::core::runner::RunSettings;
use gridgarage::tools::{self, TOOLS};

use super::args::{CliArgs, Command, RunArgs};
use super::errors::AppError;

fn parse_assignment(param: &str) -> Result<(String, String), AppError> {
    match param.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(AppError::InvalidAssignment {
            param: param.to_string(),
        }),
    }
}

/// Parameter values from a JSON object. Arrays become `;`-joined multi-values,
/// nulls are skipped.
fn load_params_file(path: &Path) -> Result<IndexMap<String, String>, AppError> {
    let text = fs::read_to_string(path)?;
    let Value::Object(map) = serde_json::from_str::<Value>(&text)? else {
        return Err(AppError::InvalidParamsFile {
            found: path.display().to_string(),
        });
    };

    let mut values = IndexMap::new();
    for (name, value) in map {
        let text = match value {
            Value::Null => continue,
            Value::String(s) => s,
            Value::Array(items) => items
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(";"),
            other => other.to_string(),
        };
        values.insert(name, text);
    }
    Ok(values)
}

fn list_tools() {
    for tool in TOOLS {
        println!("{:<28} {:<16} {}", tool.name, tool.alias, tool.description);
    }
}

fn describe_tool(name: &str) -> Result<(), AppError> {
    let info = tools::find_tool(name)?;
    let schema = tools::tool_schema(info.name)?;
    let doc = serde_json::json!({
        "tool": info,
        "parameters": schema.specs,
    });
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn run_tool(args: RunArgs) -> Result<(), AppError> {
    let mut values = match &args.params_file {
        Some(path) => load_params_file(path)?,
        None => IndexMap::new(),
    };
    for param in &args.params {
        let (name, value) = parse_assignment(param)?;
        values.insert(name, value);
    }
    debug!("Parameter values {:?}", values);

    let mut settings = RunSettings::from_env();
    if let Some(dir) = args.app_data_dir {
        settings = settings.with_app_data_dir(dir);
    }

    let report = tools::run_by_name(&args.tool, &values, settings, Arc::new(ConsoleMessages))?;
    info!("Run {} complete", report.run_id);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub fn run(args: CliArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.log {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
    }

    match args.command {
        Command::List => list_tools(),
        Command::Describe { tool } => describe_tool(&tool)?,
        Command::Run(run_args) => run_tool(run_args)?,
    }

    Ok(())
}
