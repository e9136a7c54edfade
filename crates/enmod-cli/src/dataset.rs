use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use enmod_core::DataElement;
use tracing::debug;

/// Read a dataset: a JSON array of `{concept, type, instance, value}`
/// records, kept in file order.
pub fn load_dataset(path: &Path) -> Result<Vec<DataElement>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading dataset {}", path.display()))?;
    let elements: Vec<DataElement> = serde_json::from_str(&contents)
        .with_context(|| format!("parsing dataset {}", path.display()))?;
    debug!(path = %path.display(), elements = elements.len(), "loaded dataset");
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use enmod_algo::test_utils::{single_flow_dataset, write_dataset};
    use tempfile::tempdir;

    #[test]
    fn test_load_keeps_file_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dataset.json");
        let elements = single_flow_dataset();
        write_dataset(&elements, &path).unwrap();
        assert_eq!(load_dataset(&path).unwrap(), elements);
    }

    #[test]
    fn test_malformed_dataset_names_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{\"concept\": 1}").unwrap();
        let err = load_dataset(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.json"));
    }
}
