use std::path::Path;

use anyhow::{anyhow, Result};
use enmod_algo::default_registry;
use enmod_core::graph_utils::{dependency_graph, dependency_stats, export_graph};
use enmod_core::{compile, CompileOptions};
use tracing::info;

use enmod_cli::{load_dataset, GraphFormat};

pub fn handle(dataset: &Path, format: GraphFormat) -> Result<()> {
    let elements = load_dataset(dataset)?;
    info!("Tracing dependencies of {}", dataset.display());
    let options = CompileOptions {
        validate: false,
        want_dependencies: true,
    };
    let out = compile(&elements, &default_registry(), options)?;
    let map = out
        .dependencies
        .ok_or_else(|| anyhow!("compiler returned no dependency map"))?;
    let graph = dependency_graph(&map, elements.len());

    match format {
        GraphFormat::Dot => println!("{}", export_graph(&graph, &elements, "dot")?),
        GraphFormat::Stats => {
            let stats = dependency_stats(&graph);
            println!("Dependency graph for {}:", dataset.display());
            println!("  Elements      : {}", stats.node_count);
            println!("  Dependencies  : {}", stats.edge_count);
            println!("  Independent   : {}", stats.independent);
            println!("  Unreferenced  : {}", stats.unreferenced);
            println!("  Max in-degree : {}", stats.max_in_degree);
            println!("  Depth         : {}", stats.depth);
            println!("  Cyclic        : {}", stats.cyclic);
        }
    }
    Ok(())
}
