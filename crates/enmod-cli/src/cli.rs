use clap::{Parser, Subcommand, ValueEnum, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "enmod", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check a dataset for duplicates, unknown types and dangling references
    Check {
        /// JSON dataset (array of data elements)
        #[arg(value_hint = ValueHint::FilePath)]
        dataset: PathBuf,
        /// Print the diagnostics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compile a dataset and list the resulting model objects
    Compile {
        #[arg(value_hint = ValueHint::FilePath)]
        dataset: PathBuf,
        /// Also print which elements each element depended on
        #[arg(long)]
        deps: bool,
        /// Skip the post-compilation reference check
        #[arg(long)]
        no_validate: bool,
        #[arg(long)]
        json: bool,
    },
    /// Inspect the element dependency graph
    Graph {
        #[arg(value_hint = ValueHint::FilePath)]
        dataset: PathBuf,
        #[arg(long, value_enum, default_value_t = GraphFormat::Stats)]
        format: GraphFormat,
    },
    /// Compile, build an LP and solve a rolling horizon
    Run {
        #[arg(value_hint = ValueHint::FilePath)]
        dataset: PathBuf,
        /// TOML run configuration
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: Option<PathBuf>,
        /// Number of windows to solve
        #[arg(long)]
        steps: Option<usize>,
        /// Hours between window starts
        #[arg(long)]
        step_hours: Option<f64>,
        /// Start of the first window (YYYY-MM-DDTHH:MM:SS)
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        json: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GraphFormat {
    /// Node, edge and depth summary
    Stats,
    /// Graphviz DOT
    Dot,
}
