//! The geodata operations a tool may ask for, independent of the backend that
//! performs them. `GdalGeodata` is the production implementation; tests inject
//! their own.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{PixelType, ResampleMethod};

/// Errors raised by geodata providers
#[derive(Debug, Error)]
pub enum GeodataError {
    #[error("GDAL error: {0}")]
    Gdal(#[from] gdal::errors::GdalError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("'{0}' does not exist")]
    DoesNotExist(String),
    #[error("'{0}' is not a raster dataset")]
    NotARaster(String),
    #[error("'{0}' has an unknown spatial reference")]
    UnknownSrs(String),
    #[error("Spatial reference '{dataset}' does not match '{aoi}'")]
    UnmatchedSrs { dataset: String, aoi: String },
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Band index {index} out of range (dataset has {bands} bands)")]
    BandOutOfRange { index: usize, bands: usize },
    #[error("Dimension mismatch: expected {0}x{1}, got {2}x{3}")]
    DimensionMismatch(usize, usize, usize, usize),
    #[error("Invalid cell size: {0}")]
    InvalidCellSize(f64),
}

/// Axis-aligned bounding box in dataset coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin: xmin.min(xmax),
            ymin: ymin.min(ymax),
            xmax: xmin.max(xmax),
            ymax: ymin.max(ymax),
        }
    }

    /// Extent covered by a `cols` x `rows` grid under an affine geotransform.
    pub fn from_geotransform(gt: &[f64; 6], cols: usize, rows: usize) -> Self {
        let (w, h) = (cols as f64, rows as f64);
        let xs = [gt[0], gt[0] + gt[1] * w, gt[0] + gt[2] * h, gt[0] + gt[1] * w + gt[2] * h];
        let ys = [gt[3], gt[3] + gt[4] * w, gt[3] + gt[5] * h, gt[3] + gt[4] * w + gt[5] * h];
        let fold = |v: &[f64; 4], f: fn(f64, f64) -> f64| v[1..].iter().fold(v[0], |a, &b| f(a, b));
        Self {
            xmin: fold(&xs, f64::min),
            ymin: fold(&ys, f64::min),
            xmax: fold(&xs, f64::max),
            ymax: fold(&ys, f64::max),
        }
    }

    pub fn equals(&self, other: &Extent) -> bool {
        self == other
    }

    /// `other` lies inside `self`; boundaries may touch.
    pub fn contains(&self, other: &Extent) -> bool {
        self.xmin <= other.xmin
            && self.ymin <= other.ymin
            && self.xmax >= other.xmax
            && self.ymax >= other.ymax
    }

    pub fn within(&self, other: &Extent) -> bool {
        other.contains(self)
    }

    pub fn disjoint(&self, other: &Extent) -> bool {
        self.xmax < other.xmin
            || other.xmax < self.xmin
            || self.ymax < other.ymin
            || other.ymax < self.ymin
    }

    /// Boundaries meet but the interiors do not.
    pub fn touches(&self, other: &Extent) -> bool {
        !self.disjoint(other)
            && (self.xmax == other.xmin
                || other.xmax == self.xmin
                || self.ymax == other.ymin
                || other.ymax == self.ymin)
    }

    /// Interiors intersect and neither extent contains the other.
    pub fn overlaps(&self, other: &Extent) -> bool {
        !self.disjoint(other)
            && !self.touches(other)
            && !self.contains(other)
            && !other.contains(self)
    }
}

impl std::fmt::Display for Extent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {} {}", self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

/// What a provider knows about a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Description {
    pub path: PathBuf,
    pub cols: usize,
    pub rows: usize,
    pub bands: usize,
    pub geotransform: [f64; 6],
    /// Human readable spatial reference name, `"Unknown"` when absent
    pub spatial_reference: String,
    pub extent: Extent,
    pub nodata: Option<f64>,
}

impl Description {
    pub fn cell_size(&self) -> (f64, f64) {
        (self.geotransform[1].abs(), self.geotransform[5].abs())
    }

    pub fn has_known_srs(&self) -> bool {
        !self.spatial_reference.is_empty()
            && !self.spatial_reference.to_ascii_lowercase().contains("unknown")
    }
}

/// Options honoured by [`Geodata::copy_raster`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CopyOptions {
    /// 1-based band to copy; all bands when `None`
    pub band: Option<usize>,
    pub pixel_type: Option<PixelType>,
    /// NoData value written to the output
    pub nodata_value: Option<f64>,
    /// Cells with this value become NoData in the output
    pub background_value: Option<f64>,
}

/// An output raster: where it goes and the format it is written in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterTarget {
    pub path: PathBuf,
    /// Normalized raster format extension (`".TIFF"`), `""` for the native format
    pub format: String,
}

impl RasterTarget {
    pub fn new(path: impl Into<PathBuf>, format: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            format: format.into(),
        }
    }
}

/// Geodata operations provider.
pub trait Geodata {
    fn exists(&self, path: &Path) -> bool;

    fn describe(&self, path: &Path) -> Result<Description, GeodataError>;

    fn copy_raster(
        &self,
        source: &Path,
        destination: &RasterTarget,
        options: &CopyOptions,
    ) -> Result<(), GeodataError>;

    /// Replace NoData cells with `value`.
    fn fill_nodata(
        &self,
        source: &Path,
        destination: &RasterTarget,
        value: f64,
    ) -> Result<(), GeodataError>;

    /// Turn cells equal to `value` into NoData.
    fn set_value_to_null(
        &self,
        source: &Path,
        destination: &RasterTarget,
        value: f64,
    ) -> Result<(), GeodataError>;

    fn resample(
        &self,
        source: &Path,
        destination: &RasterTarget,
        cell_size: f64,
        method: ResampleMethod,
    ) -> Result<(), GeodataError>;
}

impl<G: Geodata + ?Sized> Geodata for &G {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn describe(&self, path: &Path) -> Result<Description, GeodataError> {
        (**self).describe(path)
    }

    fn copy_raster(
        &self,
        source: &Path,
        destination: &RasterTarget,
        options: &CopyOptions,
    ) -> Result<(), GeodataError> {
        (**self).copy_raster(source, destination, options)
    }

    fn fill_nodata(
        &self,
        source: &Path,
        destination: &RasterTarget,
        value: f64,
    ) -> Result<(), GeodataError> {
        (**self).fill_nodata(source, destination, value)
    }

    fn set_value_to_null(
        &self,
        source: &Path,
        destination: &RasterTarget,
        value: f64,
    ) -> Result<(), GeodataError> {
        (**self).set_value_to_null(source, destination, value)
    }

    fn resample(
        &self,
        source: &Path,
        destination: &RasterTarget,
        cell_size: f64,
        method: ResampleMethod,
    ) -> Result<(), GeodataError> {
        (**self).resample(source, destination, cell_size, method)
    }
}

/// Raise `DoesNotExist` for a missing dataset.
pub fn validate_geodata<G: Geodata + ?Sized>(geodata: &G, path: &Path) -> Result<(), GeodataError> {
    if geodata.exists(path) {
        Ok(())
    } else {
        Err(GeodataError::DoesNotExist(path.display().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_from_north_up_geotransform() {
        let gt = [100.0, 10.0, 0.0, 500.0, 0.0, -10.0];
        let e = Extent::from_geotransform(&gt, 4, 3);
        assert_eq!(e, Extent::new(100.0, 470.0, 140.0, 500.0));
    }

    #[test]
    fn extent_predicates() {
        let aoi = Extent::new(0.0, 0.0, 10.0, 10.0);
        let inner = Extent::new(2.0, 2.0, 5.0, 5.0);
        let shifted = Extent::new(5.0, 5.0, 15.0, 15.0);
        let neighbour = Extent::new(10.0, 0.0, 20.0, 10.0);
        let far = Extent::new(50.0, 50.0, 60.0, 60.0);

        assert!(aoi.contains(&inner));
        assert!(inner.within(&aoi));
        assert!(!inner.contains(&aoi));
        assert!(aoi.overlaps(&shifted));
        assert!(!aoi.overlaps(&inner));
        assert!(aoi.touches(&neighbour));
        assert!(!aoi.overlaps(&neighbour));
        assert!(aoi.disjoint(&far));
        assert!(!aoi.touches(&far));
        assert!(aoi.equals(&Extent::new(10.0, 10.0, 0.0, 0.0)));
    }

    #[test]
    fn unknown_srs_is_detected() {
        let mut d = Description {
            path: PathBuf::from("a.tif"),
            cols: 1,
            rows: 1,
            bands: 1,
            geotransform: [0.0, 1.0, 0.0, 0.0, 0.0, -1.0],
            spatial_reference: "Unknown".into(),
            extent: Extent::new(0.0, 0.0, 1.0, 1.0),
            nodata: None,
        };
        assert!(!d.has_known_srs());
        d.spatial_reference = "GDA94 / MGA zone 55".into();
        assert!(d.has_known_srs());
        assert_eq!(d.cell_size(), (1.0, 1.0));
    }
}
