mod common;

use std::path::PathBuf;
use std::sync::Arc;

use gridgarage::core::logging::MessageLog;
use gridgarage::core::runner::{RunSettings, Tool, ToolRunner};
use gridgarage::error::Error;
use gridgarage::io::geodata::Extent;
use gridgarage::tools::{
    CompareExtentsGeodataTool, CopyRasterTool, ResampleRasterTool, SetNodataValueRasterTool,
    SetValueToNullRasterTool,
};
use serde_json::json;
use tempfile::tempdir;

use common::{MockGeodata, read_json, values, write_table};

const SRS: &str = "GDA94 / MGA zone 55";

fn geodata() -> MockGeodata {
    MockGeodata::new()
        .with_raster("/in/dem.tif", Extent::new(0.0, 0.0, 100.0, 100.0), SRS)
        .with_raster("/in/slope.tif", Extent::new(50.0, 50.0, 150.0, 150.0), SRS)
}

#[test]
fn copy_writes_one_output_per_row() {
    let dir = tempdir().expect("tempdir");
    let table = write_table(dir.path(), "t.json", "raster", &["/in/dem.tif", "/in/missing.tif"]);
    let out = dir.path().join("out");
    let mock = geodata();

    let tool = CopyRasterTool::with_geodata(&mock);
    let params = tool
        .schema()
        .bind(&values(&[
            ("raster_table", table.to_str().expect("utf8")),
            ("raster_format", "TIFF"),
            ("output_workspace", out.to_str().expect("utf8")),
            ("output_filename_suffix", "_copy"),
        ]))
        .expect("bind");
    let mut runner = ToolRunner::new(tool, RunSettings::default().with_app_data_dir(dir.path()));
    let report = runner
        .execute(params, Arc::new(MessageLog::new()))
        .expect("run");

    assert_eq!(report.passed(), 1);
    assert_eq!(report.failed(), 1);
    assert_eq!(
        mock.written(),
        vec![(
            "copy".to_string(),
            PathBuf::from("/in/dem.tif"),
            out.join("dem_copy.TIFF")
        )]
    );

    let tables = report.tables.expect("tables");
    let passes = read_json(&tables.pass_table);
    assert_eq!(passes[0]["raster"], json!(out.join("dem_copy.TIFF").display().to_string()));
    assert_eq!(passes[0]["source_geodata"], json!("/in/dem.tif"));
    assert_eq!(read_json(&tables.fail_table)[0]["raster"], json!("/in/missing.tif"));
}

#[test]
fn copy_splits_requested_bands() {
    let dir = tempdir().expect("tempdir");
    let table = write_table(dir.path(), "t.json", "raster", &["/in/dem.tif"]);
    let out = dir.path().join("out");
    let mock = geodata();

    let tool = CopyRasterTool::with_geodata(&mock);
    let params = tool
        .schema()
        .bind(&values(&[
            ("raster_table", table.to_str().expect("utf8")),
            ("bands", "1;3"),
            ("pixel_type", "32_BIT_FLOAT"),
            ("output_workspace", out.to_str().expect("utf8")),
        ]))
        .expect("bind");
    let mut runner = ToolRunner::new(tool, RunSettings::default().with_app_data_dir(dir.path()));
    let report = runner
        .execute(params, Arc::new(MessageLog::new()))
        .expect("run");

    let written: Vec<_> = mock.written().into_iter().map(|(op, _, dst)| (op, dst)).collect();
    assert_eq!(
        written,
        vec![
            ("copy band 1".to_string(), out.join("dem_Band_1")),
            ("copy band 3".to_string(), out.join("dem_Band_3")),
        ]
    );
    let passes = read_json(&report.tables.expect("tables").pass_table);
    assert_eq!(
        passes[0]["raster"],
        json!(format!(
            "{};{}",
            out.join("dem_Band_1").display(),
            out.join("dem_Band_3").display()
        ))
    );
}

#[test]
fn raster_value_tools_pass_their_value_through() {
    let dir = tempdir().expect("tempdir");
    let table = write_table(dir.path(), "t.json", "raster", &["/in/dem.tif"]);
    let out = dir.path().join("out");
    let settings = RunSettings::default().with_app_data_dir(dir.path());
    let mock = geodata();
    let shared = [
        ("raster_table", table.to_str().expect("utf8")),
        ("output_workspace", out.to_str().expect("utf8")),
        ("output_filename_prefix", "n_"),
    ];

    let tool = SetNodataValueRasterTool::with_geodata(&mock);
    let mut pairs = shared.to_vec();
    pairs.push(("ndv", "-9999"));
    let params = tool.schema().bind(&values(&pairs)).expect("bind");
    ToolRunner::new(tool, settings.clone())
        .execute(params, Arc::new(MessageLog::new()))
        .expect("set nodata");

    let tool = SetValueToNullRasterTool::with_geodata(&mock);
    let mut pairs = shared.to_vec();
    pairs.push(("val_to_null", "0"));
    let params = tool.schema().bind(&values(&pairs)).expect("bind");
    ToolRunner::new(tool, settings.clone())
        .execute(params, Arc::new(MessageLog::new()))
        .expect("set null");

    let tool = ResampleRasterTool::with_geodata(&mock);
    let mut pairs = shared.to_vec();
    pairs.push(("cell_size", "25"));
    pairs.push(("resampling_type", "BILINEAR"));
    let params = tool.schema().bind(&values(&pairs)).expect("bind");
    ToolRunner::new(tool, settings)
        .execute(params, Arc::new(MessageLog::new()))
        .expect("resample");

    let ops: Vec<_> = mock.written().into_iter().map(|(op, _, dst)| (op, dst)).collect();
    assert_eq!(
        ops,
        vec![
            ("fill -9999".to_string(), out.join("n_dem")),
            ("null 0".to_string(), out.join("n_dem")),
            ("resample 25 BILINEAR".to_string(), out.join("n_dem")),
        ]
    );
}

#[test]
fn unknown_resampling_type_is_rejected_before_running() {
    let dir = tempdir().expect("tempdir");
    let table = write_table(dir.path(), "t.json", "raster", &["/in/dem.tif"]);
    let mock = geodata();

    let tool = ResampleRasterTool::with_geodata(&mock);
    let params = tool
        .schema()
        .bind(&values(&[
            ("raster_table", table.to_str().expect("utf8")),
            ("cell_size", "25"),
            ("resampling_type", "LANCZOS"),
            ("output_workspace", dir.path().to_str().expect("utf8")),
        ]))
        .expect("bind");
    let err = ToolRunner::new(tool, RunSettings::default().with_app_data_dir(dir.path()))
        .execute(params, Arc::new(MessageLog::new()))
        .unwrap_err();

    assert!(matches!(err, Error::InvalidParameters(ref m) if m.contains("resampling_type")));
    assert!(mock.written().is_empty());
}

#[test]
fn compare_extents_records_predicates_and_srs_failures() {
    let dir = tempdir().expect("tempdir");
    let mock = geodata()
        .with_raster("/in/aoi.tif", Extent::new(0.0, 0.0, 100.0, 100.0), SRS)
        .with_raster("/in/wgs.tif", Extent::new(0.0, 0.0, 1.0, 1.0), "WGS 84")
        .with_raster("/in/nosrs.tif", Extent::new(0.0, 0.0, 1.0, 1.0), "Unknown");
    let table = write_table(
        dir.path(),
        "t.json",
        "geodata",
        &["/in/dem.tif", "/in/slope.tif", "/in/wgs.tif", "/in/nosrs.tif", "/in/gone.tif"],
    );
    let out = dir.path().join("out");

    let tool = CompareExtentsGeodataTool::with_geodata(&mock);
    let params = tool
        .schema()
        .bind(&values(&[
            ("geodata_table", table.to_str().expect("utf8")),
            ("aoi_dataset", "/in/aoi.tif"),
            ("output_workspace", out.to_str().expect("utf8")),
        ]))
        .expect("bind");
    let messages = MessageLog::new();
    let report = ToolRunner::new(tool, RunSettings::default().with_app_data_dir(dir.path()))
        .execute(params, Arc::new(messages.clone()))
        .expect("run");

    assert_eq!(report.passed(), 2);
    assert_eq!(report.failed(), 3);

    let tables = report.tables.expect("tables");
    let passes = read_json(&tables.pass_table);
    let equal = &passes[0];
    assert_eq!(equal["geodata"], json!("/in/dem.tif"));
    assert_eq!(equal["extent_aoi"], json!(format!("0 0 100 100 {}", SRS)));
    assert_eq!(equal["extent_dataset_raw"], equal["extent_dataset_trx"]);
    assert_eq!(equal["equals_aoi"], json!(true));
    assert_eq!(equal["contains_aoi"], json!(true));
    assert_eq!(equal["overlaps_aoi"], json!(false));

    let shifted = &passes[1];
    assert_eq!(shifted["overlaps_aoi"], json!(true));
    assert_eq!(shifted["within_aoi"], json!(false));
    assert_eq!(shifted["disjoint_aoi"], json!(false));
    let keys: Vec<&str> = shifted.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        [
            "geodata",
            "extent_aoi",
            "extent_dataset_raw",
            "extent_dataset_trx",
            "contains_aoi",
            "within_aoi",
            "disjoint_aoi",
            "overlaps_aoi",
            "equals_aoi",
            "touches_aoi"
        ]
    );

    let fails = read_json(&tables.fail_table);
    let failed: Vec<_> = fails.iter().map(|r| r["geodata"].clone()).collect();
    assert_eq!(
        failed,
        vec![json!("/in/wgs.tif"), json!("/in/nosrs.tif"), json!("/in/gone.tif")]
    );
    assert!(messages.contains("does not match"));
    assert!(messages.contains("unknown spatial reference"));
    assert!(messages.contains("does not exist"));
}

#[test]
fn compare_extents_stops_when_the_aoi_is_missing() {
    let dir = tempdir().expect("tempdir");
    let table = write_table(dir.path(), "t.json", "geodata", &["/in/dem.tif"]);
    let mock = geodata();

    let tool = CompareExtentsGeodataTool::with_geodata(&mock);
    let params = tool
        .schema()
        .bind(&values(&[
            ("geodata_table", table.to_str().expect("utf8")),
            ("aoi_dataset", "/in/nowhere.tif"),
            ("output_workspace", dir.path().to_str().expect("utf8")),
        ]))
        .expect("bind");
    let err = ToolRunner::new(tool, RunSettings::default().with_app_data_dir(dir.path()))
        .execute(params, Arc::new(MessageLog::new()))
        .unwrap_err();

    assert!(matches!(err, Error::Geodata(_)));
}
