//! The batch-tool harness: parameter normalization, row iteration, result
//! tracking, host logging and the tool runner that drives them.
pub mod iterate;
pub mod logging;
pub mod params;
pub mod results;
pub mod runner;
