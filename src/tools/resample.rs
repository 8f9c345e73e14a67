use tracing::info;

use crate::core::iterate::Row;
use crate::core::params::{FromParameters, NormalizedParameters, ParameterSpec, Schema};
use crate::core::runner::{Step, StepContext, Tool, ToolInfo};
use crate::error::{Error, Result};
use crate::io::gdal::GdalGeodata;
use crate::io::geodata::{Geodata, validate_geodata};
use crate::io::table::Record;
use crate::tools::{OutputOptions, raster_record, row_path};
use crate::types::{ParameterType, ResampleMethod};

pub const NAME: &str = "ResampleRasterTool";

pub const INFO: ToolInfo = ToolInfo {
    name: NAME,
    alias: "resample",
    label: "Resample",
    description: "Resample rasters to a new cell size",
};

#[derive(Debug, Clone, PartialEq)]
pub struct ResampleRasterConfig {
    pub cell_size: f64,
    pub method: ResampleMethod,
    pub output: OutputOptions,
}

impl FromParameters for ResampleRasterConfig {
    fn from_parameters(params: &NormalizedParameters) -> Result<Self> {
        let method = match params.optional_text("resampling_type")? {
            Some(label) => {
                ResampleMethod::from_label(label).ok_or_else(|| Error::InvalidArgument {
                    arg: "resampling_type",
                    value: label.to_string(),
                })?
            }
            None => ResampleMethod::Nearest,
        };
        Ok(Self {
            cell_size: params.required_float("cell_size")?,
            method,
            output: OutputOptions::from_parameters(params)?,
        })
    }
}

pub struct ResampleRasterTool<G: Geodata = GdalGeodata> {
    geodata: G,
}

impl ResampleRasterTool {
    pub fn new() -> Self {
        Self::with_geodata(GdalGeodata::new())
    }
}

impl Default for ResampleRasterTool {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Geodata> ResampleRasterTool<G> {
    pub fn with_geodata(geodata: G) -> Self {
        Self { geodata }
    }

    fn iterate(&mut self, ctx: &mut StepContext<'_, ResampleRasterConfig>) -> Result<()> {
        let config = ctx.config;
        ctx.iterate_on_table("resample", None, &[], true, |row| self.resample(config, row))?;
        Ok(())
    }

    fn resample(&self, config: &ResampleRasterConfig, row: &Row) -> Result<Option<Record>> {
        let source = row_path(row, "raster")?;
        validate_geodata(&self.geodata, &source)?;

        let out = config.output.raster_path(&source, "");
        self.geodata
            .resample(&source, &out, config.cell_size, config.method)?;
        info!(
            "Resampled {} to {} ({} {})",
            source.display(),
            out.path.display(),
            config.cell_size,
            config.method
        );

        Ok(Some(raster_record(&[out], &source)))
    }
}

impl<G: Geodata> Tool for ResampleRasterTool<G> {
    type Config = ResampleRasterConfig;

    const INFO: ToolInfo = INFO;

    fn schema(&self) -> Schema {
        Schema::new()
            .input_table_view("raster", "Table for Rasters")
            .parameter(ParameterSpec::new("cell_size", "Cell Size", ParameterType::Double))
            .parameter(
                ParameterSpec::new("resampling_type", "Resampling Type", ParameterType::String)
                    .choices(ResampleMethod::LABELS)
                    .default_value("NEAREST"),
            )
            .raster_format(false)
            .output_tables(true)
    }

    fn steps(&self) -> Vec<Step<Self>> {
        vec![Step {
            name: "iterate",
            run: Self::iterate,
        }]
    }
}
