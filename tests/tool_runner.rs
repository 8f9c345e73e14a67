mod common;

use std::fs;
use std::sync::Arc;

use gridgarage::core::iterate::Row;
use gridgarage::core::logging::MessageLog;
use gridgarage::core::params::{NormalizedParameters, ParameterSpec, Schema};
use gridgarage::core::runner::{RunSettings, RunState, Step, StepContext, Tool, ToolInfo, ToolRunner};
use gridgarage::error::Error;
use gridgarage::types::{ParameterType, Severity};
use serde_json::json;
use tempfile::tempdir;

use common::{read_json, values, write_table};

/// Fails on the row whose raster is `r2.tif`. With `halt` set, a `finish` step
/// after `iterate` returns an error.
#[derive(Default)]
struct Checker {
    calls: Vec<&'static str>,
    halt: bool,
}

impl Checker {
    fn setup(&mut self, _ctx: &mut StepContext<'_, NormalizedParameters>) -> gridgarage::Result<()> {
        self.calls.push("setup");
        Ok(())
    }

    fn iterate(&mut self, ctx: &mut StepContext<'_, NormalizedParameters>) -> gridgarage::Result<()> {
        self.calls.push("iterate");
        ctx.iterate_on_table("check", None, &[], true, |row: &Row| {
            if row["raster"] == json!("r2.tif") {
                Err(Error::Processing("bad".into()))
            } else {
                Ok(None)
            }
        })?;
        Ok(())
    }

    fn finish(&mut self, _ctx: &mut StepContext<'_, NormalizedParameters>) -> gridgarage::Result<()> {
        self.calls.push("finish");
        Err(Error::Processing("disk full".into()))
    }
}

impl Tool for Checker {
    type Config = NormalizedParameters;

    const INFO: ToolInfo = ToolInfo {
        name: "CheckerTool",
        alias: "checker",
        label: "Checker",
        description: "Fails on one row",
    };

    fn schema(&self) -> Schema {
        Schema::new()
            .input_table_view("raster", "Table for Rasters")
            .parameter(
                ParameterSpec::new("threshold", "Threshold", ParameterType::Double).optional(),
            )
            .output_tables(false)
    }

    fn steps(&self) -> Vec<Step<Self>> {
        let mut steps = vec![
            Step {
                name: "setup",
                run: Self::setup,
            },
            Step {
                name: "iterate",
                run: Self::iterate,
            },
        ];
        if self.halt {
            steps.push(Step {
                name: "finish",
                run: Self::finish,
            });
        }
        steps
    }
}

struct NoSteps;

impl Tool for NoSteps {
    type Config = NormalizedParameters;

    const INFO: ToolInfo = ToolInfo {
        name: "NoStepsTool",
        alias: "no_steps",
        label: "No Steps",
        description: "Declares nothing to run",
    };

    fn schema(&self) -> Schema {
        Schema::new()
    }

    fn steps(&self) -> Vec<Step<Self>> {
        Vec::new()
    }
}

#[test]
fn failing_row_is_logged_and_recorded_and_the_run_completes() {
    let dir = tempdir().expect("tempdir");
    let table = write_table(dir.path(), "rasters.json", "raster", &["r1.tif", "r2.tif", "r3.tif"]);
    let workspace = dir.path().join("out");
    let settings = RunSettings::default().with_app_data_dir(dir.path().join("app"));

    let tool = Checker::default();
    let params = tool
        .schema()
        .bind(&values(&[
            ("raster_table", table.to_str().expect("utf8 path")),
            ("output_workspace", workspace.to_str().expect("utf8 path")),
        ]))
        .expect("bind");
    let messages = MessageLog::new();
    let mut runner = ToolRunner::new(tool, settings);

    let report = runner
        .execute(params, Arc::new(messages.clone()))
        .expect("run completes");

    assert_eq!(runner.tool().calls, vec!["setup", "iterate"]);
    assert_eq!(runner.state(), RunState::Done);
    assert_eq!(report.passed(), 2);
    assert_eq!(report.failed(), 1);

    let tables = report.tables.expect("tables written");
    let fails = read_json(&tables.fail_table);
    assert_eq!(fails.len(), 1);
    assert_eq!(fails[0]["raster"], json!("r2.tif"));
    let passes = read_json(&tables.pass_table);
    assert_eq!(passes.len(), 2);
    assert_eq!(
        tables.pass_table,
        workspace.join(format!("{}_pass.json", report.run_id))
    );

    assert!(
        messages
            .with_severity(Severity::Error)
            .iter()
            .any(|m| m.contains("bad"))
    );
    let log = fs::read_to_string(&report.log_file).expect("log file");
    assert!(log.contains("bad"));
    assert!(log.contains("Processing row 2 of 3"));
    assert!(report.log_file.ends_with("CheckerTool.log"));
}

#[test]
fn result_table_name_overrides_the_run_id() {
    let dir = tempdir().expect("tempdir");
    let table = write_table(dir.path(), "rasters.json", "raster", &["r1.tif"]);
    let workspace = dir.path().join("out");

    let tool = Checker::default();
    let params = tool
        .schema()
        .bind(&values(&[
            ("raster_table", table.to_str().expect("utf8 path")),
            ("output_workspace", workspace.to_str().expect("utf8 path")),
            ("result_table_name", "checked"),
        ]))
        .expect("bind");
    let mut runner = ToolRunner::new(tool, RunSettings::default().with_app_data_dir(dir.path()));
    let report = runner
        .execute(params, Arc::new(MessageLog::new()))
        .expect("run completes");

    let tables = report.tables.expect("tables written");
    assert_eq!(tables.pass_table, workspace.join("checked_pass.json"));
    assert!(tables.fail_table.exists());
}

#[test]
fn tool_without_steps_fails_fast() {
    let dir = tempdir().expect("tempdir");
    let mut runner = ToolRunner::new(NoSteps, RunSettings::default().with_app_data_dir(dir.path()));
    let err = runner
        .execute(Vec::new(), Arc::new(MessageLog::new()))
        .unwrap_err();

    assert!(matches!(err, Error::EmptyExecutionList));
    assert!(err.is_configuration());
    assert_eq!(runner.state(), RunState::Constructed);
}

#[test]
fn non_numeric_value_aborts_before_any_step() {
    let dir = tempdir().expect("tempdir");
    let table = write_table(dir.path(), "rasters.json", "raster", &["r1.tif"]);

    let tool = Checker::default();
    let params = tool
        .schema()
        .bind(&values(&[
            ("raster_table", table.to_str().expect("utf8 path")),
            ("output_workspace", dir.path().to_str().expect("utf8 path")),
            ("threshold", "abc"),
        ]))
        .expect("bind");
    let messages = MessageLog::new();
    let mut runner = ToolRunner::new(tool, RunSettings::default().with_app_data_dir(dir.path()));

    let err = runner
        .execute(params, Arc::new(messages.clone()))
        .unwrap_err();

    assert!(matches!(err, Error::ValueCoercion { .. }));
    assert!(runner.tool().calls.is_empty());
    assert!(messages.contains("abc"));
}

#[test]
fn empty_table_stops_the_run_at_the_iterate_step() {
    let dir = tempdir().expect("tempdir");
    let table = write_table(dir.path(), "rasters.json", "raster", &[]);
    let workspace = dir.path().join("out");

    let tool = Checker::default();
    let params = tool
        .schema()
        .bind(&values(&[
            ("raster_table", table.to_str().expect("utf8 path")),
            ("output_workspace", workspace.to_str().expect("utf8 path")),
        ]))
        .expect("bind");
    let mut runner = ToolRunner::new(tool, RunSettings::default().with_app_data_dir(dir.path()));
    let err = runner
        .execute(params, Arc::new(MessageLog::new()))
        .unwrap_err();

    assert!(matches!(err, Error::NoRows));
    assert_eq!(runner.tool().calls, vec!["setup", "iterate"]);
    assert_eq!(runner.state(), RunState::Done);
    assert!(matches!(
        runner.execute(Vec::new(), Arc::new(MessageLog::new())),
        Err(Error::AlreadyExecuted)
    ));
}

#[test]
fn failing_step_still_writes_the_rows_recorded_before_it() {
    let dir = tempdir().expect("tempdir");
    let table = write_table(dir.path(), "rasters.json", "raster", &["r1.tif", "r2.tif", "r3.tif"]);
    let workspace = dir.path().join("out");

    let tool = Checker {
        halt: true,
        ..Default::default()
    };
    let params = tool
        .schema()
        .bind(&values(&[
            ("raster_table", table.to_str().expect("utf8 path")),
            ("output_workspace", workspace.to_str().expect("utf8 path")),
            ("result_table_name", "partial"),
        ]))
        .expect("bind");
    let messages = MessageLog::new();
    let mut runner = ToolRunner::new(tool, RunSettings::default().with_app_data_dir(dir.path()));

    let err = runner
        .execute(params, Arc::new(messages.clone()))
        .unwrap_err();

    assert!(matches!(err, Error::Processing(ref m) if m == "disk full"));
    assert_eq!(runner.tool().calls, vec!["setup", "iterate", "finish"]);
    assert_eq!(runner.state(), RunState::Done);
    assert!(messages.contains("finish failed"));

    let passes = read_json(&workspace.join("partial_pass.json"));
    let fails = read_json(&workspace.join("partial_fail.json"));
    let passed: Vec<_> = passes.iter().map(|r| r["raster"].clone()).collect();
    assert_eq!(passed, vec![json!("r1.tif"), json!("r3.tif")]);
    assert_eq!(fails.len(), 1);
    assert_eq!(fails[0]["raster"], json!("r2.tif"));
}
