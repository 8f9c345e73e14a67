use gdal::raster::{Buffer, GdalType, ResampleAlg};
use gdal::{Dataset, DriverManager};
use ndarray::Array2;
use std::path::Path;
use tracing::debug;

use crate::io::geodata::{CopyOptions, Description, Extent, Geodata, GeodataError, RasterTarget};
use crate::types::{PixelType, ResampleMethod};

/// Geodata provider backed by GDAL
#[derive(Debug, Clone, Copy, Default)]
pub struct GdalGeodata;

/// A raster opened for reading, with the georeferencing every writer copies over.
struct RasterSource {
    dataset: Dataset,
    cols: usize,
    rows: usize,
    bands: usize,
    geotransform: [f64; 6],
    projection: String,
}

/// Raster about to be written: band arrays of identical shape plus georeferencing.
struct RasterOutput {
    bands: Vec<Array2<f64>>,
    geotransform: [f64; 6],
    projection: String,
    nodata: Option<f64>,
    pixel_type: PixelType,
}

// Helper to extract EPSG code from WKT authority tag
fn parse_epsg(wkt: &str) -> Option<String> {
    const KEY: &str = "AUTHORITY[\"EPSG\",\"";
    if let Some(idx) = wkt.rfind(KEY) {
        let start = idx + KEY.len();
        if let Some(end) = wkt[start..].find('"') {
            let code = &wkt[start..start + end];
            return Some(format!("EPSG:{}", code));
        }
    }
    None
}

// Name of the outermost WKT node, e.g. `PROJCS["GDA94 / MGA zone 55",...` -> `GDA94 / MGA zone 55`
fn parse_wkt_name(wkt: &str) -> Option<String> {
    let open = wkt.find("[\"")?;
    let rest = &wkt[open + 2..];
    let end = rest.find('"')?;
    let name = &rest[..end];
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Spatial reference name for a projection string; `"Unknown"` when there is none.
pub fn spatial_reference_name(projection: &str) -> String {
    let projection = projection.trim();
    if projection.is_empty() {
        return "Unknown".to_string();
    }
    if projection.starts_with("EPSG:") {
        return projection.to_string();
    }
    parse_wkt_name(projection)
        .or_else(|| parse_epsg(projection))
        .unwrap_or_else(|| "Unknown".to_string())
}

/// GDAL driver for a normalized raster format (`".TIFF"`, `"img"`).
/// The empty native format is written as GeoTIFF.
pub fn driver_name_for(format: &str) -> Result<&'static str, GeodataError> {
    let ext = format.trim_start_matches('.').to_ascii_lowercase();

    match ext.as_str() {
        "" | "tif" | "tiff" => Ok("GTiff"),
        "img" => Ok("HFA"),
        "bil" | "bip" | "bsq" => Ok("ENVI"),
        other => Err(GeodataError::UnsupportedFormat(format!(
            "no writable driver for '.{}'",
            other
        ))),
    }
}

fn resample_alg(method: ResampleMethod) -> ResampleAlg {
    match method {
        ResampleMethod::Nearest => ResampleAlg::NearestNeighbour,
        ResampleMethod::Bilinear => ResampleAlg::Bilinear,
        ResampleMethod::Cubic => ResampleAlg::Cubic,
        ResampleMethod::Average => ResampleAlg::Average,
    }
}

fn is_nodata(value: f64, nodata: Option<f64>) -> bool {
    match nodata {
        Some(nd) if nd.is_nan() => value.is_nan(),
        Some(nd) => value == nd,
        None => false,
    }
}

impl RasterSource {
    fn open(path: &Path) -> Result<Self, GeodataError> {
        if !path.exists() {
            return Err(GeodataError::DoesNotExist(path.display().to_string()));
        }
        let dataset = Dataset::open(path)?;
        let (cols, rows) = dataset.raster_size();
        let bands = dataset.raster_count() as usize;
        if bands == 0 {
            return Err(GeodataError::NotARaster(path.display().to_string()));
        }
        let geotransform = match dataset.geo_transform() {
            Ok(gt) => gt,
            Err(_) => [0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        };
        let projection = dataset.projection();
        Ok(RasterSource {
            dataset,
            cols,
            rows,
            bands,
            geotransform,
            projection,
        })
    }

    fn nodata(&self, index: usize) -> Result<Option<f64>, GeodataError> {
        Ok(self.dataset.rasterband(index)?.no_data_value())
    }

    /// Read a single band (1-based index) as an f64 ndarray of shape (rows, cols),
    /// optionally resampled into a `(cols, rows)` target window.
    fn read_band(
        &self,
        index: usize,
        shape: Option<(usize, usize)>,
        alg: Option<ResampleAlg>,
    ) -> Result<Array2<f64>, GeodataError> {
        if index == 0 || index > self.bands {
            return Err(GeodataError::BandOutOfRange {
                index,
                bands: self.bands,
            });
        }
        let band = self.dataset.rasterband(index)?;
        let window = (self.cols, self.rows);
        let (out_cols, out_rows) = shape.unwrap_or(window);
        let buf = band.read_as::<f64>((0, 0), window, (out_cols, out_rows), alg)?;
        let data_vec = buf.data().to_vec();
        let got = data_vec.len();
        Array2::from_shape_vec((out_rows, out_cols), data_vec).map_err(|_| {
            GeodataError::DimensionMismatch(out_cols, out_rows, got, 1)
        })
    }

    fn describe(&self, path: &Path) -> Result<Description, GeodataError> {
        Ok(Description {
            path: path.to_path_buf(),
            cols: self.cols,
            rows: self.rows,
            bands: self.bands,
            geotransform: self.geotransform,
            spatial_reference: spatial_reference_name(&self.projection),
            extent: Extent::from_geotransform(&self.geotransform, self.cols, self.rows),
            nodata: self.nodata(1)?,
        })
    }
}

fn write_typed<T: GdalType + Copy>(
    destination: &RasterTarget,
    raster: &RasterOutput,
    convert: fn(f64) -> T,
) -> Result<(), GeodataError> {
    let first = raster
        .bands
        .first()
        .ok_or_else(|| GeodataError::UnsupportedFormat("no bands to write".into()))?;
    let (rows, cols) = first.dim();

    let driver = DriverManager::get_driver_by_name(driver_name_for(&destination.format)?)?;
    let mut ds =
        driver.create_with_band_type::<T, _>(&destination.path, cols, rows, raster.bands.len())?;
    ds.set_geo_transform(&raster.geotransform)?;
    if !raster.projection.is_empty() {
        ds.set_projection(&raster.projection)?;
    }

    for (i, data) in raster.bands.iter().enumerate() {
        if data.dim() != (rows, cols) {
            let (r, c) = data.dim();
            return Err(GeodataError::DimensionMismatch(cols, rows, c, r));
        }
        let mut band = ds.rasterband(i + 1)?;
        if let Some(nd) = raster.nodata {
            band.set_no_data_value(Some(nd))?;
        }
        let values: Vec<T> = data.iter().map(|&v| convert(v)).collect();
        let mut buf = Buffer::new((cols, rows), values);
        band.write((0, 0), (cols, rows), &mut buf)?;
    }
    Ok(())
}

fn write_raster(destination: &RasterTarget, raster: &RasterOutput) -> Result<(), GeodataError> {
    driver_name_for(&destination.format)?;
    if let Some(parent) = destination.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    debug!(
        "Writing {} band(s) of {} to {:?}",
        raster.bands.len(),
        raster.pixel_type,
        destination.path
    );
    match raster.pixel_type {
        PixelType::U8 => write_typed::<u8>(destination, raster, |v| v as u8),
        PixelType::I16 => write_typed::<i16>(destination, raster, |v| v as i16),
        PixelType::U16 => write_typed::<u16>(destination, raster, |v| v as u16),
        PixelType::I32 => write_typed::<i32>(destination, raster, |v| v as i32),
        PixelType::U32 => write_typed::<u32>(destination, raster, |v| v as u32),
        PixelType::F32 => write_typed::<f32>(destination, raster, |v| v as f32),
        PixelType::F64 => write_typed::<f64>(destination, raster, |v| v),
    }
}

impl GdalGeodata {
    pub fn new() -> Self {
        Self
    }

    /// Apply `f(value, band_nodata)` to every cell of every band and write the result.
    fn map_cells<F>(
        &self,
        source: &Path,
        destination: &RasterTarget,
        nodata: impl Fn(Option<f64>) -> Option<f64>,
        f: F,
    ) -> Result<(), GeodataError>
    where
        F: Fn(f64, Option<f64>) -> f64,
    {
        let src = RasterSource::open(source)?;
        let mut bands = Vec::with_capacity(src.bands);
        let mut out_nodata = None;
        for index in 1..=src.bands {
            let band_nodata = src.nodata(index)?;
            let data = src.read_band(index, None, None)?;
            bands.push(data.mapv(|v| f(v, band_nodata)));
            if index == 1 {
                out_nodata = nodata(band_nodata);
            }
        }
        write_raster(
            destination,
            &RasterOutput {
                bands,
                geotransform: src.geotransform,
                projection: src.projection.clone(),
                nodata: out_nodata,
                pixel_type: PixelType::F64,
            },
        )
    }
}

impl Geodata for GdalGeodata {
    fn exists(&self, path: &Path) -> bool {
        path.exists() && Dataset::open(path).is_ok()
    }

    fn describe(&self, path: &Path) -> Result<Description, GeodataError> {
        RasterSource::open(path)?.describe(path)
    }

    fn copy_raster(
        &self,
        source: &Path,
        destination: &RasterTarget,
        options: &CopyOptions,
    ) -> Result<(), GeodataError> {
        let src = RasterSource::open(source)?;
        let indices: Vec<usize> = match options.band {
            Some(b) if b == 0 || b > src.bands => {
                return Err(GeodataError::BandOutOfRange {
                    index: b,
                    bands: src.bands,
                });
            }
            Some(b) => vec![b],
            None => (1..=src.bands).collect(),
        };
        let source_nodata = src.nodata(indices[0])?;
        let nodata = options.nodata_value.or(source_nodata);

        let mut bands = Vec::with_capacity(indices.len());
        for index in indices {
            let mut data = src.read_band(index, None, None)?;
            if let (Some(bg), Some(nd)) = (options.background_value, nodata) {
                data.mapv_inplace(|v| if v == bg { nd } else { v });
            }
            if let (Some(old), Some(new)) = (source_nodata, options.nodata_value) {
                data.mapv_inplace(|v| if is_nodata(v, Some(old)) { new } else { v });
            }
            bands.push(data);
        }

        write_raster(
            destination,
            &RasterOutput {
                bands,
                geotransform: src.geotransform,
                projection: src.projection.clone(),
                nodata,
                pixel_type: options.pixel_type.unwrap_or(PixelType::F64),
            },
        )
    }

    fn fill_nodata(
        &self,
        source: &Path,
        destination: &RasterTarget,
        value: f64,
    ) -> Result<(), GeodataError> {
        self.map_cells(
            source,
            destination,
            |_| None,
            |v, nd| if is_nodata(v, nd) { value } else { v },
        )
    }

    fn set_value_to_null(
        &self,
        source: &Path,
        destination: &RasterTarget,
        value: f64,
    ) -> Result<(), GeodataError> {
        self.map_cells(
            source,
            destination,
            |_| Some(value),
            |v, nd| if v == value || is_nodata(v, nd) { value } else { v },
        )
    }

    fn resample(
        &self,
        source: &Path,
        destination: &RasterTarget,
        cell_size: f64,
        method: ResampleMethod,
    ) -> Result<(), GeodataError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(GeodataError::InvalidCellSize(cell_size));
        }
        let src = RasterSource::open(source)?;
        let gt = src.geotransform;
        let width = src.cols as f64 * gt[1].abs();
        let height = src.rows as f64 * gt[5].abs();
        let out_cols = ((width / cell_size).round() as usize).max(1);
        let out_rows = ((height / cell_size).round() as usize).max(1);

        let mut bands = Vec::with_capacity(src.bands);
        for index in 1..=src.bands {
            bands.push(src.read_band(
                index,
                Some((out_cols, out_rows)),
                Some(resample_alg(method)),
            )?);
        }

        let geotransform = [
            gt[0],
            cell_size * gt[1].signum(),
            gt[2],
            gt[3],
            gt[4],
            cell_size * gt[5].signum(),
        ];
        write_raster(
            destination,
            &RasterOutput {
                bands,
                geotransform,
                projection: src.projection.clone(),
                nodata: src.nodata(1)?,
                pixel_type: PixelType::F64,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spatial_reference_names() {
        assert_eq!(spatial_reference_name(""), "Unknown");
        assert_eq!(spatial_reference_name("EPSG:4326"), "EPSG:4326");
        let wkt = r#"PROJCS["GDA94 / MGA zone 55",GEOGCS["GDA94"],AUTHORITY["EPSG","28355"]]"#;
        assert_eq!(spatial_reference_name(wkt), "GDA94 / MGA zone 55");
        assert_eq!(parse_epsg(wkt).as_deref(), Some("EPSG:28355"));
    }

    #[test]
    fn drivers_follow_the_raster_format() {
        assert_eq!(driver_name_for("").unwrap(), "GTiff");
        assert_eq!(driver_name_for(".TIF").unwrap(), "GTiff");
        assert_eq!(driver_name_for(".img").unwrap(), "HFA");
        assert_eq!(driver_name_for("BIL").unwrap(), "ENVI");
        assert!(matches!(
            driver_name_for(".JPEG"),
            Err(GeodataError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn nodata_comparison_handles_nan() {
        assert!(is_nodata(f64::NAN, Some(f64::NAN)));
        assert!(is_nodata(-9999.0, Some(-9999.0)));
        assert!(!is_nodata(1.0, Some(-9999.0)));
        assert!(!is_nodata(1.0, None));
    }
}
