//! GridGarage CLI entrypoint.
//!
//! Provides a thin wrapper over the `cli` module: parse args, list, describe or
//! run a tool, and exit with appropriate status.
//! For programmatic use, prefer the library API (`gridgarage::tools`).

use clap::Parser;

mod cli;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = cli::CliArgs::parse();
    cli::run(args)
}
