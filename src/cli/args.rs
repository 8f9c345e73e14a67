use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gridgarage", version, about = "GridGarage batch geoprocessing tools")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Enable logging to the terminal outside tool runs
    #[arg(long, global = true, default_value_t = false)]
    pub log: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the available tools
    List,

    /// Print a tool's parameter schema as JSON
    Describe {
        /// Tool name or alias
        tool: String,
    },

    /// Run a tool
    Run(RunArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Tool name or alias
    pub tool: String,

    /// Parameter value as NAME=VALUE (repeatable; multi-value parameters take `a;b;c`)
    #[arg(short = 'p', long = "param", value_name = "NAME=VALUE")]
    pub params: Vec<String>,

    /// JSON object of parameter values; `--param` entries override it
    #[arg(long)]
    pub params_file: Option<PathBuf>,

    /// Directory for tool log files (defaults to GRIDGARAGE_HOME or the platform data dir)
    #[arg(long)]
    pub app_data_dir: Option<PathBuf>,
}
