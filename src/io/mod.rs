//! I/O layer: the geodata provider seam and its GDAL implementation, JSON table
//! views and result record sets, and output dataset naming.
pub mod geodata;
pub use geodata::{
    CopyOptions, Description, Extent, Geodata, GeodataError, RasterTarget, validate_geodata,
};

pub mod gdal;
pub use self::gdal::GdalGeodata;

pub mod naming;
pub mod table;
pub use table::{Record, TableView};
