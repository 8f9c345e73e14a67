//! Command Line Interface (CLI) layer for GridGarage.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the orchestration logic (`runner`) that binds user-supplied values to a
//! tool's schema and runs it with console messages.
//!
//! If you are embedding GridGarage into another application, run tools through
//! `gridgarage::core::runner::ToolRunner` instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
