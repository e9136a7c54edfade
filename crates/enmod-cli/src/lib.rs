pub mod cli;
pub mod config;
pub mod dataset;

pub use cli::{Cli, Commands, GraphFormat};
pub use config::{RunConfig, SolverConfig};
pub use dataset::load_dataset;
