//! Compare the extent of each dataset in a table with an area of interest.
use std::path::PathBuf;

use serde_json::json;
use tracing::{debug, info};

use crate::core::iterate::Row;
use crate::core::params::{FromParameters, NormalizedParameters, ParameterSpec, Schema};
use crate::core::runner::{Step, StepContext, Tool, ToolInfo};
use crate::error::{Error, Result};
use crate::io::gdal::GdalGeodata;
use crate::io::geodata::{Extent, Geodata, GeodataError, validate_geodata};
use crate::io::table::Record;
use crate::tools::row_path;
use crate::types::ParameterType;

pub const NAME: &str = "CompareExtentsGeodataTool";

pub const INFO: ToolInfo = ToolInfo {
    name: NAME,
    alias: "compare_extents",
    label: "Compare Extents",
    description: "Compare dataset extents with an area of interest",
};

const AOI_DATASET: &str = "aoi_dataset";

#[derive(Debug, Clone, PartialEq)]
pub struct CompareExtentsConfig {
    pub aoi_dataset: PathBuf,
}

impl FromParameters for CompareExtentsConfig {
    fn from_parameters(params: &NormalizedParameters) -> Result<Self> {
        let aoi = params.object(AOI_DATASET)?;
        let path = aoi.value_as_text().ok_or_else(|| {
            Error::InvalidParameters(format!("'{}' requires a value", AOI_DATASET))
        })?;
        Ok(Self {
            aoi_dataset: PathBuf::from(path),
        })
    }
}

/// The area of interest, described once per run.
#[derive(Debug, Clone, PartialEq)]
struct Aoi {
    extent: Extent,
    srs: String,
}

impl Aoi {
    fn label(&self) -> String {
        format!("{} {}", self.extent, self.srs)
    }
}

pub struct CompareExtentsGeodataTool<G: Geodata = GdalGeodata> {
    geodata: G,
    aoi: Option<Aoi>,
}

impl CompareExtentsGeodataTool {
    pub fn new() -> Self {
        Self::with_geodata(GdalGeodata::new())
    }
}

impl Default for CompareExtentsGeodataTool {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: Geodata> CompareExtentsGeodataTool<G> {
    pub fn with_geodata(geodata: G) -> Self {
        Self { geodata, aoi: None }
    }

    fn initialise(&mut self, ctx: &mut StepContext<'_, CompareExtentsConfig>) -> Result<()> {
        let path = &ctx.config.aoi_dataset;
        validate_geodata(&self.geodata, path)?;
        let description = self.geodata.describe(path)?;
        let aoi = Aoi {
            extent: description.extent,
            srs: description.spatial_reference,
        };
        info!("AOI extent {}", aoi.label());
        self.aoi = Some(aoi);
        Ok(())
    }

    fn iterate(&mut self, ctx: &mut StepContext<'_, CompareExtentsConfig>) -> Result<()> {
        let aoi = self
            .aoi
            .clone()
            .ok_or_else(|| Error::Processing("area of interest was not initialised".into()))?;
        let geodata = &self.geodata;
        ctx.iterate_on_table("compare", Some("geodata_table"), &[], true, |row| {
            compare(geodata, &aoi, row)
        })?;
        Ok(())
    }
}

fn compare<G: Geodata>(geodata: &G, aoi: &Aoi, row: &Row) -> Result<Option<Record>> {
    let path = row_path(row, "geodata")?;
    validate_geodata(geodata, &path)?;

    let description = geodata.describe(&path)?;
    let name = path.display().to_string();
    if !description.has_known_srs() {
        return Err(GeodataError::UnknownSrs(name).into());
    }
    if description.spatial_reference != aoi.srs {
        return Err(GeodataError::UnmatchedSrs {
            dataset: description.spatial_reference,
            aoi: aoi.srs.clone(),
        }
        .into());
    }

    // Same spatial reference: the transformed extent is the raw one.
    let extent = description.extent;
    let extent_string = format!("{} {}", extent, description.spatial_reference);
    debug!("{} extent {}", name, extent_string);

    let mut record = Record::new();
    record.insert("geodata".into(), json!(name));
    record.insert("extent_aoi".into(), json!(aoi.label()));
    record.insert("extent_dataset_raw".into(), json!(extent_string));
    record.insert("extent_dataset_trx".into(), json!(extent_string));
    record.insert("contains_aoi".into(), json!(extent.contains(&aoi.extent)));
    record.insert("within_aoi".into(), json!(extent.within(&aoi.extent)));
    record.insert("disjoint_aoi".into(), json!(extent.disjoint(&aoi.extent)));
    record.insert("overlaps_aoi".into(), json!(extent.overlaps(&aoi.extent)));
    record.insert("equals_aoi".into(), json!(extent.equals(&aoi.extent)));
    record.insert("touches_aoi".into(), json!(extent.touches(&aoi.extent)));
    Ok(Some(record))
}

impl<G: Geodata> Tool for CompareExtentsGeodataTool<G> {
    type Config = CompareExtentsConfig;

    const INFO: ToolInfo = INFO;

    fn schema(&self) -> Schema {
        Schema::new()
            .input_table_view("geodata", "Table for Geodata")
            .parameter(ParameterSpec::new(
                AOI_DATASET,
                "Dataset to compare with",
                ParameterType::Dataset,
            ))
            .output_tables(false)
    }

    fn steps(&self) -> Vec<Step<Self>> {
        vec![
            Step {
                name: "initialise",
                run: Self::initialise,
            },
            Step {
                name: "iterate",
                run: Self::iterate,
            },
        ]
    }

    fn exclude_parameters(&self) -> &'static [&'static str] {
        &[AOI_DATASET]
    }
}
