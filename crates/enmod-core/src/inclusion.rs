//! Inclusion engine: fixed-point resolution of data elements into objects.
//!
//! Dependency sets are only discovered by attempting an inclusion, since
//! they depend on attribute contents, so the engine does not sort elements
//! up front. It runs rounds over the incomplete elements in input order until
//! every element is included or a round makes no progress. The number of
//! rounds is bounded by the longest dependency chain.

use std::collections::BTreeMap;

use tracing::debug;

use crate::compile::DependencyIndexMap;
use crate::element::DataElement;
use crate::error::{CoreError, CoreResult};
use crate::identity::Id;
use crate::registry::{Deps, Inclusion, TypeRegistry};
use crate::root_cause;
use crate::store::ObjectStores;
use crate::validation::check_duplicates;

/// Result of a successful inclusion.
#[derive(Debug)]
pub struct InclusionOutcome {
    pub stores: ObjectStores,
    /// Dependency record of the final attempt per element
    pub records: Vec<Deps>,
    /// Every created object with the position of the element that created it
    pub producers: BTreeMap<Id, usize>,
    pub rounds: usize,
}

impl InclusionOutcome {
    /// Map each element position to the sorted positions of the elements it
    /// directly depended on.
    pub fn dependency_index_map(&self, elements: &[DataElement]) -> DependencyIndexMap {
        let mut natural: BTreeMap<Id, usize> = BTreeMap::new();
        for (position, element) in elements.iter().enumerate() {
            natural.entry(element.id()).or_insert(position);
        }
        self.records
            .iter()
            .enumerate()
            .map(|(position, record)| {
                let mut targets: Vec<usize> = record
                    .ids
                    .iter()
                    .filter_map(|id| self.producers.get(id).or_else(|| natural.get(id)).copied())
                    .filter(|&target| target != position)
                    .collect();
                targets.sort_unstable();
                targets.dedup();
                (position, targets)
            })
            .collect()
    }
}

/// Run the inclusion fixed point over `elements`.
///
/// Fails with [`CoreError::DuplicateElements`] before any handler runs, with
/// [`CoreError::UnregisteredType`] or [`CoreError::MalformedReturn`] as soon
/// as they occur, and with [`CoreError::Unresolvable`] when a round stalls.
pub fn include_elements(
    elements: &[DataElement],
    registry: &TypeRegistry,
) -> CoreResult<InclusionOutcome> {
    check_duplicates(elements)?;

    let mut stores = ObjectStores::new();
    let mut completed = vec![false; elements.len()];
    let mut records = vec![Deps::new(); elements.len()];
    let mut producers = BTreeMap::new();
    let mut remaining = elements.len();
    let mut rounds = 0;

    while remaining > 0 {
        rounds += 1;
        let mut progress = 0;

        for (position, element) in elements.iter().enumerate() {
            if completed[position] {
                continue;
            }
            let type_key = element.type_key();
            let handler = registry
                .get(&type_key)
                .ok_or_else(|| CoreError::UnregisteredType {
                    type_key,
                    element: element.key.clone(),
                })?;

            let revision = stores.revision();
            let created_before = stores.created().len();
            let result = handler
                .include(&mut stores, &element.key, &element.value)
                .map_err(|err| CoreError::in_element(&element.key, err))?;
            let mutated = stores.revision() != revision;

            match result {
                Inclusion::Included(deps) => {
                    if !mutated {
                        return Err(malformed(
                            element,
                            "reported included without changing storage",
                        ));
                    }
                    if let Some(absent) = deps.ids.iter().find(|id| !stores.contains(id)) {
                        return Err(malformed(
                            element,
                            &format!("reported included but dependency {absent} is not in storage"),
                        ));
                    }
                    for id in &stores.created()[created_before..] {
                        producers.insert(id.clone(), position);
                    }
                    records[position] = deps;
                    completed[position] = true;
                    remaining -= 1;
                    progress += 1;
                }
                deferred => {
                    if mutated {
                        return Err(malformed(element, "deferred after changing storage"));
                    }
                    records[position] = deferred.into_record();
                }
            }
        }

        debug!(round = rounds, progress, remaining, "inclusion round");

        if progress == 0 && remaining > 0 {
            let report = root_cause::analyze(elements, &completed, &records, &producers, |id| {
                stores.contains(id)
            });
            return Err(CoreError::Unresolvable(report));
        }
    }

    Ok(InclusionOutcome {
        stores,
        records,
        producers,
        rounds,
    })
}

fn malformed(element: &DataElement, reason: &str) -> CoreError {
    CoreError::MalformedReturn {
        element: element.key.clone(),
        reason: reason.to_string(),
    }
}
