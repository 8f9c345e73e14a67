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

pub const NAME: &str = "SetNodataValueRasterTool";

pub const INFO: ToolInfo = ToolInfo {
    name: NAME,
    alias: "set_nodata",
    label: "Set NoData Value",
    description: "Replace NoData cells in rasters with a value",
};

#[derive(Debug, Clone, PartialEq)]
pub struct SetNodataValueConfig {
    pub ndv: f64,
    pub output: OutputOptions,
}

impl FromParameters for SetNodataValueConfig {
    fn from_parameters(params: &NormalizedParameters) -> Result<Self> {
        Ok(Self {
            ndv: params.required_float("ndv")?,
            output: OutputOptions::from_parameters(params)?,
        })
    }
}

pub struct SetNodataValueRasterTool<G: Geodata = GdalGeodata> {
    geodata: G,
}

impl SetNodataValueRasterTool {
    pub fn new() -> Self {
        Self::with_geodata(GdalGeodata::new())
    }
}

impl Default for SetNodataValueRasterTool {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Geodata> SetNodataValueRasterTool<G> {
    pub fn with_geodata(geodata: G) -> Self {
        Self { geodata }
    }

    fn iterate(&mut self, ctx: &mut StepContext<'_, SetNodataValueConfig>) -> Result<()> {
        let config = ctx.config;
        ctx.iterate_on_table("fill_nodata", None, &[], true, |row| self.fill_nodata(config, row))?;
        Ok(())
    }

    fn fill_nodata(&self, config: &SetNodataValueConfig, row: &Row) -> Result<Option<Record>> {
        let source = row_path(row, "raster")?;
        validate_geodata(&self.geodata, &source)?;

        let out = config.output.raster_path(&source, "");
        self.geodata.fill_nodata(&source, &out, config.ndv)?;
        info!("NoData in {} set to {} in {}", source.display(), config.ndv, out.path.display());

        Ok(Some(raster_record(&[out], &source)))
    }
}

impl<G: Geodata> Tool for SetNodataValueRasterTool<G> {
    type Config = SetNodataValueConfig;

    const INFO: ToolInfo = INFO;

    fn schema(&self) -> Schema {
        Schema::new()
            .input_table_view("raster", "Table for Rasters")
            .parameter(ParameterSpec::new("ndv", "Value for NoData", ParameterType::Double))
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
