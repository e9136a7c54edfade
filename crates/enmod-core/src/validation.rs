//! Referential-integrity checks before and after compilation.

use std::collections::{BTreeMap, HashSet};

use crate::diagnostics::{DiagnosticIssue, Diagnostics, Severity};
use crate::element::DataElement;
use crate::error::{CoreError, CoreResult};
use crate::identity::{ElementKey, Id};
use crate::registry::{ObjectCheck, TypeRegistry};
use crate::store::ModelObjects;

/// Reject any element key that occurs more than once.
pub fn check_duplicates(elements: &[DataElement]) -> CoreResult<()> {
    let duplicates = duplicate_keys(elements);
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(CoreError::DuplicateElements(duplicates))
    }
}

fn duplicate_keys(elements: &[DataElement]) -> Vec<ElementKey> {
    let mut counts: BTreeMap<&ElementKey, usize> = BTreeMap::new();
    for element in elements {
        *counts.entry(&element.key).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(key, _)| key.clone())
        .collect()
}

/// Dataset-level checks that need no compilation: duplicate keys,
/// unregistered types and statically declared references to elements that
/// do not exist.
pub fn validate_dataset(elements: &[DataElement], registry: &TypeRegistry) -> Diagnostics {
    let mut diag = Diagnostics::new();

    for key in duplicate_keys(elements) {
        diag.add_error_for("duplicate", "element key occurs more than once", &key.to_string());
    }

    let known: HashSet<Id> = elements.iter().map(DataElement::id).collect();
    for (position, element) in elements.iter().enumerate() {
        let Some(handler) = registry.get(&element.type_key()) else {
            diag.add(
                DiagnosticIssue::new(
                    Severity::Error,
                    "registry",
                    format!("unregistered type {}", element.type_key()),
                )
                .with_element(element.key.to_string())
                .with_position(position),
            );
            continue;
        };
        for reference in handler.references(&element.key, &element.value) {
            if !known.contains(&reference) {
                diag.add(
                    DiagnosticIssue::new(
                        Severity::Error,
                        "reference",
                        format!("missing element {reference} referenced by {}", element.key),
                    )
                    .with_element(element.key.to_string())
                    .with_position(position),
                );
            }
        }
    }

    diag
}

/// Post-compilation check: every reference reported by a top-level object
/// resolves in storage. Dangling references are an error; `checks` then add
/// their warnings.
pub fn validate_objects(
    objects: &ModelObjects,
    checks: &[ObjectCheck],
) -> CoreResult<Diagnostics> {
    let dangling: Vec<String> = objects
        .iter()
        .flat_map(|(id, object)| {
            object
                .references()
                .into_iter()
                .filter(|reference| !objects.contains(reference))
                .map(move |reference| format!("{id} references missing {reference}"))
        })
        .collect();
    if !dangling.is_empty() {
        return Err(CoreError::Validation(dangling.join("; ")));
    }

    let mut diag = Diagnostics::new();
    for check in checks {
        check(objects, &mut diag);
    }
    Ok(diag)
}
