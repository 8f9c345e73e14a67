use tracing::info;

use crate::core::iterate::Row;
use crate::core::params::{FromParameters, NormalizedParameters, ParameterSpec, Schema};
use crate::core::runner::{Step, StepContext, Tool, ToolInfo};
use crate::error::Result;
use crate::io::gdal::GdalGeodata;
use crate::io::geodata::{Geodata, validate_geodata};
use crate::io::table::Record;
use crate::tools::{OutputOptions, raster_record, row_path};
use crate::types::ParameterType;

pub const NAME: &str = "SetValueToNullRasterTool";

pub const INFO: ToolInfo = ToolInfo {
    name: NAME,
    alias: "set_null",
    label: "Set Value to Null",
    description: "Turn cells equal to a value into NoData",
};

#[derive(Debug, Clone, PartialEq)]
pub struct SetValueToNullConfig {
    pub val_to_null: f64,
    pub output: OutputOptions,
}

impl FromParameters for SetValueToNullConfig {
    fn from_parameters(params: &NormalizedParameters) -> Result<Self> {
        Ok(Self {
            val_to_null: params.required_float("val_to_null")?,
            output: OutputOptions::from_parameters(params)?,
        })
    }
}

pub struct SetValueToNullRasterTool<G: Geodata = GdalGeodata> {
    geodata: G,
}

impl SetValueToNullRasterTool {
    pub fn new() -> Self {
        Self::with_geodata(GdalGeodata::new())
    }
}

impl Default for SetValueToNullRasterTool {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Geodata> SetValueToNullRasterTool<G> {
    pub fn with_geodata(geodata: G) -> Self {
        Self { geodata }
    }

    fn iterate(&mut self, ctx: &mut StepContext<'_, SetValueToNullConfig>) -> Result<()> {
        let config = ctx.config;
        ctx.iterate_on_table("set_null", None, &[], true, |row| self.set_null(config, row))?;
        Ok(())
    }

    fn set_null(&self, config: &SetValueToNullConfig, row: &Row) -> Result<Option<Record>> {
        let source = row_path(row, "raster")?;
        validate_geodata(&self.geodata, &source)?;

        let out = config.output.raster_path(&source, "");
        self.geodata.set_value_to_null(&source, &out, config.val_to_null)?;
        info!(
            "{} cells in {} set to NoData in {}",
            config.val_to_null,
            source.display(),
            out.path.display()
        );

        Ok(Some(raster_record(&[out], &source)))
    }
}

impl<G: Geodata> Tool for SetValueToNullRasterTool<G> {
    type Config = SetValueToNullConfig;

    const INFO: ToolInfo = INFO;

    fn schema(&self) -> Schema {
        Schema::new()
            .input_table_view("raster", "Table for Rasters")
            .parameter(ParameterSpec::new(
                "val_to_null",
                "Value to set to NoData",
                ParameterType::Double,
            ))
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
