#![doc = r#"
GridGarage: batch geoprocessing tools over tables of datasets.

Each tool iterates one geoprocessing operation (raster copy, NoData assignment,
value-to-null masking, resampling, extent comparison) over the rows of a table
view or the values of a multi-value parameter. Every row either passes or fails;
outcomes are recorded into a pass table and a fail table, and progress is
reported to the host's message window and to a per-tool log file.

Requirements
------------
- GDAL development headers and runtime available on your system.
- Rust 2024 edition toolchain.

Run a tool by name
------------------
```rust,no_run
use std::sync::Arc;
use indexmap::IndexMap;
use gridgarage::core::logging::ConsoleMessages;
use gridgarage::core::runner::RunSettings;

fn main() -> gridgarage::Result<()> {
    let mut values = IndexMap::new();
    values.insert("raster_table".to_string(), "/data/rasters.json".to_string());
    values.insert("ndv".to_string(), "-9999".to_string());
    values.insert("output_workspace".to_string(), "/out".to_string());

    let report = gridgarage::tools::run_by_name(
        "set_nodata",
        &values,
        RunSettings::from_env(),
        Arc::new(ConsoleMessages),
    )?;
    println!("passed={} failed={}", report.passed(), report.failed());
    Ok(())
}
```

Write your own tool
-------------------
A tool declares a parameter [`Schema`](core::params::Schema), a typed config
built from the normalized parameters ([`FromParameters`](core::params::FromParameters))
and the [`Step`](core::runner::Step)s the [`ToolRunner`](core::runner::ToolRunner)
runs in order. Steps hand per-row workers to the row iterator:

```rust,no_run
use gridgarage::core::params::{NormalizedParameters, Schema};
use gridgarage::core::runner::{Step, StepContext, Tool, ToolInfo};

struct ListRasters;

impl ListRasters {
    fn iterate(&mut self, ctx: &mut StepContext<'_, NormalizedParameters>) -> gridgarage::Result<()> {
        ctx.iterate_on_table("list", None, &[], true, |_row| Ok(None))?;
        Ok(())
    }
}

impl Tool for ListRasters {
    type Config = NormalizedParameters;

    const INFO: ToolInfo = ToolInfo {
        name: "ListRastersTool",
        alias: "list_rasters",
        label: "List Rasters",
        description: "Record every raster of a table",
    };

    fn schema(&self) -> Schema {
        Schema::new()
            .input_table_view("raster", "Table for Rasters")
            .output_tables(false)
    }

    fn steps(&self) -> Vec<Step<Self>> {
        vec![Step { name: "iterate", run: Self::iterate }]
    }
}
```

Error handling
--------------
All public functions return `gridgarage::Result<T>`. `Error::is_configuration`
separates mistakes in how a tool was put together from failures while
processing data. Row failures never surface here: they end up in the fail table.

Useful modules
--------------
- [`core`]: parameters, row iteration, result tracking, logging and the tool runner.
- [`tools`]: the concrete tools and their registry.
- [`io`]: the geodata provider seam (GDAL-backed), table views and output naming.
- [`types`]: parameter types, pixel types and resampling methods.
- [`error`]: crate-level `Error` and `Result`.
"#]

// Core modules (public)
pub mod core;
pub mod error;
pub mod io;
pub mod tools;
pub mod types;

// Curated public API surface
pub use error::{Error, Result};
pub use types::{ParameterType, PixelType, ResampleMethod, Severity};

pub use self::core::iterate::{IterationReport, Row};
pub use self::core::logging::{ConsoleMessages, MessageLog, MessageSink};
pub use self::core::params::{FromParameters, NormalizedParameters, ParamValue, Parameter, Schema};
pub use self::core::results::ResultTracker;
pub use self::core::runner::{RunReport, RunSettings, Step, StepContext, Tool, ToolInfo, ToolRunner};

pub use io::{Extent, GdalGeodata, Geodata, GeodataError, RasterTarget, Record};
