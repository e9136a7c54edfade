use std::path::Path;

use anyhow::{bail, Result};
use enmod_algo::default_registry;
use enmod_core::validate_dataset;
use tracing::info;

use super::{print_diagnostics, print_json};
use enmod_cli::load_dataset;

pub fn handle(dataset: &Path, json: bool) -> Result<()> {
    let elements = load_dataset(dataset)?;
    info!("Checking {} element(s) from {}", elements.len(), dataset.display());
    let diagnostics = validate_dataset(&elements, &default_registry());
    if json {
        print_json(&diagnostics)?;
    } else if diagnostics.has_issues() {
        print_diagnostics(&diagnostics)?;
    } else {
        println!("{}: {} element(s), no issues", dataset.display(), elements.len());
    }
    if diagnostics.has_errors() {
        bail!("{} failed the check: {}", dataset.display(), diagnostics.summary());
    }
    Ok(())
}
