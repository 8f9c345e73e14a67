//! Copy rasters, optionally one output per band, with pixel type and NoData
//! conversion.
use std::path::Path;

use tracing::{debug, info};

use crate::core::iterate::Row;
use crate::core::params::{FromParameters, NormalizedParameters, ParameterSpec, Schema};
use crate::core::runner::{Step, StepContext, Tool, ToolInfo};
use crate::error::{Error, Result};
use crate::io::gdal::GdalGeodata;
use crate::io::geodata::{CopyOptions, Geodata, RasterTarget, validate_geodata};
use crate::io::table::Record;
use crate::tools::{OutputOptions, raster_record, row_path};
use crate::types::{ParameterType, PixelType};

pub const NAME: &str = "CopyRasterTool";

pub const INFO: ToolInfo = ToolInfo {
    name: NAME,
    alias: "copy",
    label: "Copy",
    description: "Copy rasters",
};

#[derive(Debug, Clone, PartialEq)]
pub struct CopyRasterConfig {
    pub background_value: Option<f64>,
    pub nodata_value: Option<f64>,
    pub pixel_type: Option<PixelType>,
    /// 1-based bands to split out; all bands into one output when empty
    pub bands: Vec<usize>,
    pub output: OutputOptions,
}

impl FromParameters for CopyRasterConfig {
    fn from_parameters(params: &NormalizedParameters) -> Result<Self> {
        let pixel_type = match params.optional_text("pixel_type")? {
            Some(label) => Some(PixelType::from_label(label).ok_or_else(|| {
                Error::InvalidArgument {
                    arg: "pixel_type",
                    value: label.to_string(),
                }
            })?),
            None => None,
        };
        let bands = params
            .int_list("bands")?
            .into_iter()
            .map(|b| {
                usize::try_from(b)
                    .ok()
                    .filter(|b| *b > 0)
                    .ok_or_else(|| Error::InvalidArgument {
                        arg: "bands",
                        value: b.to_string(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            background_value: params.float("background_value")?,
            nodata_value: params.float("nodata_value")?,
            pixel_type,
            bands,
            output: OutputOptions::from_parameters(params)?,
        })
    }
}

pub struct CopyRasterTool<G: Geodata = GdalGeodata> {
    geodata: G,
}

impl CopyRasterTool {
    pub fn new() -> Self {
        Self::with_geodata(GdalGeodata::new())
    }
}

impl Default for CopyRasterTool {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Geodata> CopyRasterTool<G> {
    pub fn with_geodata(geodata: G) -> Self {
        Self { geodata }
    }

    fn iterate(&mut self, ctx: &mut StepContext<'_, CopyRasterConfig>) -> Result<()> {
        let config = ctx.config;
        ctx.iterate_on_table("copy", None, &[], true, |row| self.copy(config, row))?;
        Ok(())
    }

    fn copy(&self, config: &CopyRasterConfig, row: &Row) -> Result<Option<Record>> {
        let source = row_path(row, "raster")?;
        validate_geodata(&self.geodata, &source)?;

        let mut options = CopyOptions {
            band: None,
            pixel_type: config.pixel_type,
            nodata_value: config.nodata_value,
            background_value: config.background_value,
        };

        let outputs = if config.bands.is_empty() {
            let out = config.output.raster_path(&source, "");
            self.copy_one(&source, &out, &options)?;
            vec![out]
        } else {
            let mut outputs = Vec::with_capacity(config.bands.len());
            for band in &config.bands {
                options.band = Some(*band);
                let out = config.output.raster_path(&source, &format!("_Band_{}", band));
                self.copy_one(&source, &out, &options)?;
                outputs.push(out);
            }
            outputs
        };

        Ok(Some(raster_record(&outputs, &source)))
    }

    fn copy_one(&self, source: &Path, out: &RasterTarget, options: &CopyOptions) -> Result<()> {
        debug!("Copying {} to {} with {:?}", source.display(), out.path.display(), options);
        self.geodata.copy_raster(source, out, options)?;
        info!("copied {} to {}", source.display(), out.path.display());
        Ok(())
    }
}

impl<G: Geodata> Tool for CopyRasterTool<G> {
    type Config = CopyRasterConfig;

    const INFO: ToolInfo = INFO;

    fn schema(&self) -> Schema {
        Schema::new()
            .input_table_view("raster", "Table for Rasters")
            .raster_format(false)
            .parameter(
                ParameterSpec::new("background_value", "Background Value", ParameterType::Double)
                    .optional(),
            )
            .parameter(
                ParameterSpec::new("nodata_value", "NoData Value", ParameterType::Double)
                    .optional(),
            )
            .parameter(
                ParameterSpec::new("pixel_type", "Pixel Type", ParameterType::String)
                    .optional()
                    .choices(PixelType::LABELS),
            )
            .parameter(
                ParameterSpec::new("bands", "Bands", ParameterType::Long)
                    .optional()
                    .multi_value(),
            )
            .output_tables(true)
    }

    fn steps(&self) -> Vec<Step<Self>> {
        vec![Step {
            name: "iterate",
            run: Self::iterate,
        }]
    }
}
