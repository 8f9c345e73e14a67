//! Concrete batch tools and the registry the host looks them up in.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Value, json};

use crate::core::iterate::Row;
use crate::core::logging::MessageSink;
use crate::core::params::{
    NormalizedParameters, OUTPUT_PREFIX, OUTPUT_SUFFIX, OUTPUT_WORKSPACE, RASTER_FORMAT, Schema,
};
use crate::core::runner::{RunReport, RunSettings, Tool, ToolInfo, ToolRunner};
use crate::error::{Error, Result};
use crate::io::geodata::RasterTarget;
use crate::io::naming::make_raster_name;
use crate::io::table::Record;

pub mod compare_extents;
pub mod copy;
pub mod resample;
pub mod set_nodata;
pub mod set_null;

pub use compare_extents::{CompareExtentsConfig, CompareExtentsGeodataTool};
pub use copy::{CopyRasterConfig, CopyRasterTool};
pub use resample::{ResampleRasterConfig, ResampleRasterTool};
pub use set_nodata::{SetNodataValueConfig, SetNodataValueRasterTool};
pub use set_null::{SetValueToNullConfig, SetValueToNullRasterTool};

/// Every tool the host can run.
pub const TOOLS: [ToolInfo; 5] = [
    copy::INFO,
    set_nodata::INFO,
    set_null::INFO,
    resample::INFO,
    compare_extents::INFO,
];

/// Look a tool up by name or alias, ignoring case.
pub fn find_tool(name: &str) -> Result<&'static ToolInfo> {
    TOOLS
        .iter()
        .find(|t| t.name.eq_ignore_ascii_case(name) || t.alias.eq_ignore_ascii_case(name))
        .ok_or_else(|| Error::UnknownTool(name.to_string()))
}

/// Parameter schema of a registered tool.
pub fn tool_schema(name: &str) -> Result<Schema> {
    let info = find_tool(name)?;
    Ok(match info.name {
        copy::NAME => CopyRasterTool::new().schema(),
        set_nodata::NAME => SetNodataValueRasterTool::new().schema(),
        set_null::NAME => SetValueToNullRasterTool::new().schema(),
        resample::NAME => ResampleRasterTool::new().schema(),
        _ => CompareExtentsGeodataTool::new().schema(),
    })
}

/// Bind `values` to a registered tool's schema and run it with the GDAL provider.
pub fn run_by_name(
    name: &str,
    values: &IndexMap<String, String>,
    settings: RunSettings,
    messages: Arc<dyn MessageSink>,
) -> Result<RunReport> {
    let info = find_tool(name)?;
    match info.name {
        copy::NAME => run_tool(CopyRasterTool::new(), values, settings, messages),
        set_nodata::NAME => run_tool(SetNodataValueRasterTool::new(), values, settings, messages),
        set_null::NAME => run_tool(SetValueToNullRasterTool::new(), values, settings, messages),
        resample::NAME => run_tool(ResampleRasterTool::new(), values, settings, messages),
        _ => run_tool(CompareExtentsGeodataTool::new(), values, settings, messages),
    }
}

/// Bind `values` to `tool`'s schema and execute it once.
pub fn run_tool<T: Tool>(
    tool: T,
    values: &IndexMap<String, String>,
    settings: RunSettings,
    messages: Arc<dyn MessageSink>,
) -> Result<RunReport> {
    let parameters = tool.schema().bind(values)?;
    ToolRunner::new(tool, settings).execute(parameters, messages)
}

/// Where and how a tool names its output rasters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub workspace: PathBuf,
    /// Output extension (`""` for the native format)
    pub extension: String,
    pub prefix: String,
    pub suffix: String,
}

impl OutputOptions {
    pub fn from_parameters(params: &NormalizedParameters) -> Result<Self> {
        let optional = |name: &str| -> Result<String> {
            if params.contains(name) {
                Ok(params.optional_text(name)?.unwrap_or_default().to_string())
            } else {
                Ok(String::new())
            }
        };
        let workspace = params.optional_text(OUTPUT_WORKSPACE)?.ok_or_else(|| {
            Error::InvalidParameters(format!("'{}' requires a value", OUTPUT_WORKSPACE))
        })?;
        Ok(Self {
            workspace: PathBuf::from(workspace),
            extension: optional(RASTER_FORMAT)?,
            prefix: optional(OUTPUT_PREFIX)?,
            suffix: optional(OUTPUT_SUFFIX)?,
        })
    }

    /// Output raster for `source`, with `extra_suffix` after the configured suffix.
    /// The target keeps the configured format so the writer never guesses it from
    /// a dotted name.
    pub fn raster_path(&self, source: &Path, extra_suffix: &str) -> RasterTarget {
        let suffix = format!("{}{}", self.suffix, extra_suffix);
        RasterTarget::new(
            make_raster_name(source, &self.workspace, &self.extension, &self.prefix, &suffix),
            self.extension.clone(),
        )
    }
}

/// Dataset path held in `row[key]`.
pub(crate) fn row_path(row: &Row, key: &str) -> Result<PathBuf> {
    match row.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(PathBuf::from(s)),
        Some(Value::Null) | None => Err(Error::Processing(format!("row has no '{}' value", key))),
        Some(other) => Ok(PathBuf::from(other.to_string())),
    }
}

/// The `{raster, source_geodata}` record of the raster tools.
pub(crate) fn raster_record(outputs: &[RasterTarget], source: &Path) -> Record {
    let joined = outputs
        .iter()
        .map(|t| t.path.display().to_string())
        .collect::<Vec<_>>()
        .join(";");
    let mut record = Record::new();
    record.insert("raster".to_string(), json!(joined));
    record.insert(
        "source_geodata".to_string(),
        json!(source.display().to_string()),
    );
    record
}
