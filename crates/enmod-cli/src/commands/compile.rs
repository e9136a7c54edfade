use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;

use anyhow::Result;
use enmod_algo::default_registry;
use enmod_core::{
    compile, CompileOptions, DataElement, DependencyIndexMap, Diagnostics, ModelObjects,
};
use serde::Serialize;
use tabwriter::TabWriter;
use tracing::info;

use super::{print_diagnostics, print_json};
use enmod_cli::load_dataset;

#[derive(Debug, Serialize)]
struct ObjectSummary {
    id: String,
    periods: Option<usize>,
    references: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CompileSummary<'a> {
    objects: Vec<ObjectSummary>,
    low_level: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dependencies: Option<BTreeMap<String, Vec<String>>>,
    diagnostics: &'a Diagnostics,
}

fn summarize(objects: &ModelObjects) -> Vec<ObjectSummary> {
    objects
        .iter()
        .map(|(id, object)| ObjectSummary {
            id: id.to_string(),
            periods: object.horizon().map(|h| h.num_periods()),
            references: object.references().iter().map(ToString::to_string).collect(),
        })
        .collect()
}

/// Dependency index map keyed by element key instead of position.
fn named_dependencies(
    elements: &[DataElement],
    map: &DependencyIndexMap,
) -> BTreeMap<String, Vec<String>> {
    let name = |position: usize| {
        elements
            .get(position)
            .map(|element| element.key.to_string())
            .unwrap_or_else(|| position.to_string())
    };
    map.iter()
        .map(|(&from, targets)| (name(from), targets.iter().map(|&to| name(to)).collect()))
        .collect()
}

pub fn handle(dataset: &Path, deps: bool, validate: bool, json: bool) -> Result<()> {
    let elements = load_dataset(dataset)?;
    info!("Compiling {} element(s) from {}", elements.len(), dataset.display());
    let options = CompileOptions {
        validate,
        want_dependencies: deps,
    };
    let out = compile(&elements, &default_registry(), options)?;

    let summary = CompileSummary {
        objects: summarize(&out.objects),
        low_level: out.objects.low_level().keys().map(ToString::to_string).collect(),
        dependencies: out
            .dependencies
            .as_ref()
            .map(|map| named_dependencies(&elements, map)),
        diagnostics: &out.diagnostics,
    };
    if json {
        return print_json(&summary);
    }

    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "OBJECT\tPERIODS\tREFERENCES")?;
    for object in &summary.objects {
        let periods = object
            .periods
            .map_or_else(|| "-".to_string(), |n| n.to_string());
        writeln!(writer, "{}\t{}\t{}", object.id, periods, object.references.join(", "))?;
    }
    writer.flush()?;
    println!(
        "{} object(s), {} low-level object(s)",
        summary.objects.len(),
        summary.low_level.len()
    );

    if let Some(dependencies) = &summary.dependencies {
        println!("\nDependencies:");
        for (element, targets) in dependencies {
            if targets.is_empty() {
                println!("  {element}");
            } else {
                println!("  {element} -> {}", targets.join(", "));
            }
        }
    }
    print_diagnostics(&out.diagnostics)
}
