//! Shared helpers for the integration tests: an in-memory geodata provider and
//! small builders for table views and bound parameters.
#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use gridgarage::io::geodata::{
    CopyOptions, Description, Extent, Geodata, GeodataError, RasterTarget,
};
use gridgarage::types::ResampleMethod;
use indexmap::IndexMap;
use serde_json::Value;

/// Provider that knows a fixed set of datasets and records every write.
#[derive(Default)]
pub struct MockGeodata {
    datasets: HashMap<PathBuf, Description>,
    failing: Vec<PathBuf>,
    pub writes: Mutex<Vec<(String, PathBuf, PathBuf)>>,
}

impl MockGeodata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raster(mut self, path: &str, extent: Extent, srs: &str) -> Self {
        let path = PathBuf::from(path);
        let cols = ((extent.xmax - extent.xmin) / 10.0).round() as usize;
        let rows = ((extent.ymax - extent.ymin) / 10.0).round() as usize;
        self.datasets.insert(
            path.clone(),
            Description {
                path,
                cols,
                rows,
                bands: 1,
                geotransform: [extent.xmin, 10.0, 0.0, extent.ymax, 0.0, -10.0],
                spatial_reference: srs.to_string(),
                extent,
                nodata: None,
            },
        );
        self
    }

    /// Writes from this dataset fail.
    pub fn failing_on(mut self, path: &str) -> Self {
        self.failing.push(PathBuf::from(path));
        self
    }

    pub fn written(&self) -> Vec<(String, PathBuf, PathBuf)> {
        self.writes.lock().expect("writes lock").clone()
    }

    fn write(
        &self,
        op: &str,
        source: &Path,
        destination: &RasterTarget,
    ) -> Result<(), GeodataError> {
        if self.failing.iter().any(|p| p == source) {
            return Err(GeodataError::UnsupportedFormat(format!(
                "cannot write {}",
                destination.path.display()
            )));
        }
        self.writes.lock().expect("writes lock").push((
            op.to_string(),
            source.to_path_buf(),
            destination.path.clone(),
        ));
        Ok(())
    }
}

impl Geodata for MockGeodata {
    fn exists(&self, path: &Path) -> bool {
        self.datasets.contains_key(path)
    }

    fn describe(&self, path: &Path) -> Result<Description, GeodataError> {
        self.datasets
            .get(path)
            .cloned()
            .ok_or_else(|| GeodataError::DoesNotExist(path.display().to_string()))
    }

    fn copy_raster(
        &self,
        source: &Path,
        destination: &RasterTarget,
        options: &CopyOptions,
    ) -> Result<(), GeodataError> {
        let op = match options.band {
            Some(b) => format!("copy band {}", b),
            None => "copy".to_string(),
        };
        self.write(&op, source, destination)
    }

    fn fill_nodata(
        &self,
        source: &Path,
        destination: &RasterTarget,
        value: f64,
    ) -> Result<(), GeodataError> {
        self.write(&format!("fill {}", value), source, destination)
    }

    fn set_value_to_null(
        &self,
        source: &Path,
        destination: &RasterTarget,
        value: f64,
    ) -> Result<(), GeodataError> {
        self.write(&format!("null {}", value), source, destination)
    }

    fn resample(
        &self,
        source: &Path,
        destination: &RasterTarget,
        cell_size: f64,
        method: ResampleMethod,
    ) -> Result<(), GeodataError> {
        self.write(&format!("resample {} {}", cell_size, method), source, destination)
    }
}

/// Write a table view holding one `column` value per entry of `values`.
pub fn write_table(dir: &Path, name: &str, column: &str, values: &[&str]) -> PathBuf {
    let rows: Vec<Value> = values
        .iter()
        .map(|v| {
            let mut row = serde_json::Map::new();
            row.insert(column.to_string(), Value::from(*v));
            Value::Object(row)
        })
        .collect();
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(&rows).expect("serialize table"))
        .expect("write table");
    path
}

/// Text values keyed by parameter name, in the given order.
pub fn values(pairs: &[(&str, &str)]) -> IndexMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn read_json(path: &Path) -> Vec<IndexMap<String, Value>> {
    serde_json::from_str(&fs::read_to_string(path).expect("read record set"))
        .expect("parse record set")
}
