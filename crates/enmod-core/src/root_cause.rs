//! Root-cause analysis for a stalled inclusion fixed point.
//!
//! When a round completes no element, every incomplete element is either a
//! root cause (it waits on something that will never appear) or a cascade (it
//! waits, directly or transitively, on another incomplete element). Only root
//! causes are reported, so one missing flow referenced by hundreds of
//! elements yields one line instead of hundreds.
//!
//! Recorded dependency identities are mapped back to input positions: first
//! through the objects each completed element produced, then through the
//! natural `(concept, instance)` identity of every input element. Identities
//! that map to nothing and are absent from storage are genuinely missing.
//!
//! Incomplete elements that only wait on each other form strongly connected
//! components with no way out; those are reported as circular dependencies.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;

use crate::diagnostics::{DiagnosticIssue, Diagnostics, Severity};
use crate::element::DataElement;
use crate::identity::{ElementKey, Id};
use crate::registry::Deps;

/// Why one element never completed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RootCause {
    pub element: ElementKey,
    pub position: usize,
    /// Referenced identities that no element produces
    pub missing: Vec<Id>,
    /// Auxiliary messages supplied by the handler
    pub messages: Vec<String>,
    /// Other members of a dependency cycle this element belongs to
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cycle: Vec<ElementKey>,
}

impl RootCause {
    /// Human-readable lines for this root cause.
    pub fn lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .missing
            .iter()
            .map(|id| format!("missing element {id} referenced by {}", self.element))
            .collect();
        lines.extend(
            self.messages
                .iter()
                .map(|message| format!("{}: {message}", self.element)),
        );
        if !self.cycle.is_empty() {
            let others = self
                .cycle
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!("circular dependency between {} and {others}", self.element));
        }
        if lines.is_empty() {
            lines.push(format!(
                "{} failed for an undetermined non-dependency reason",
                self.element
            ));
        }
        lines
    }
}

/// Aggregate report of an unresolvable dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolutionReport {
    pub failed: usize,
    pub total: usize,
    pub root_causes: Vec<RootCause>,
    /// Incomplete elements that only fail because of a root cause
    pub cascades: usize,
}

impl ResolutionReport {
    pub fn lines(&self) -> Vec<String> {
        self.root_causes.iter().flat_map(RootCause::lines).collect()
    }

    pub fn to_diagnostics(&self) -> Diagnostics {
        let mut diag = Diagnostics::new();
        for cause in &self.root_causes {
            for line in cause.lines() {
                diag.add(
                    DiagnosticIssue::new(Severity::Error, "resolution", line)
                        .with_element(cause.element.to_string())
                        .with_position(cause.position),
                );
            }
        }
        diag
    }
}

impl fmt::Display for ResolutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Unresolvable dependencies: {}/{} elements failed ({} root cause{}, {} cascading)",
            self.failed,
            self.total,
            self.root_causes.len(),
            if self.root_causes.len() == 1 { "" } else { "s" },
            self.cascades
        )?;
        for line in self.lines() {
            write!(f, "\n  {line}")?;
        }
        Ok(())
    }
}

/// Build the report for a stalled inclusion.
///
/// `records` holds the latest dependency record per element, `producers`
/// maps every object created by a completed element to that element's
/// position, and `exists` tells whether an identity is present in storage.
pub fn analyze(
    elements: &[DataElement],
    completed: &[bool],
    records: &[Deps],
    producers: &BTreeMap<Id, usize>,
    exists: impl Fn(&Id) -> bool,
) -> ResolutionReport {
    let mut natural: HashMap<Id, usize> = HashMap::new();
    for (position, element) in elements.iter().enumerate() {
        natural.entry(element.id()).or_insert(position);
    }
    let owner = |id: &Id| producers.get(id).or_else(|| natural.get(id)).copied();

    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let mut nodes: BTreeMap<usize, NodeIndex> = BTreeMap::new();
    for (position, done) in completed.iter().enumerate() {
        if !done {
            nodes.insert(position, graph.add_node(position));
        }
    }

    let mut missing: BTreeMap<usize, Vec<Id>> = BTreeMap::new();
    for (&position, &node) in &nodes {
        for id in &records[position].ids {
            match owner(id) {
                Some(target) if target == position => {}
                Some(target) => {
                    if let Some(&target_node) = nodes.get(&target) {
                        graph.update_edge(node, target_node, ());
                    }
                }
                None if exists(id) => {}
                None => missing.entry(position).or_default().push(id.clone()),
            }
        }
    }

    let mut root_causes = Vec::new();
    for component in tarjan_scc(&graph) {
        let leaves_component = component.iter().any(|&node| {
            graph
                .neighbors(node)
                .any(|neighbor| !component.contains(&neighbor))
        });
        if leaves_component {
            continue;
        }
        let members: Vec<usize> = component.iter().map(|&node| graph[node]).collect();
        let is_cycle = members.len() > 1;
        for &position in &members {
            let cycle = if is_cycle {
                let mut others: Vec<ElementKey> = members
                    .iter()
                    .filter(|&&other| other != position)
                    .map(|&other| elements[other].key.clone())
                    .collect();
                others.sort();
                others
            } else {
                Vec::new()
            };
            root_causes.push(RootCause {
                element: elements[position].key.clone(),
                position,
                missing: missing.get(&position).cloned().unwrap_or_default(),
                messages: records[position].messages.clone(),
                cycle,
            });
        }
    }
    root_causes.sort_by(|a, b| a.element.cmp(&b.element));

    let failed = nodes.len();
    ResolutionReport {
        failed,
        total: elements.len(),
        cascades: failed - root_causes.len(),
        root_causes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Attributes;

    fn element(concept: &str, instance: &str) -> DataElement {
        DataElement::new(concept, "Base", instance, Attributes::new())
    }

    fn deps(ids: &[Id]) -> Deps {
        Deps {
            ids: ids.to_vec(),
            messages: Vec::new(),
        }
    }

    #[test]
    fn test_cascade_is_not_a_root_cause() {
        // C -> B -> (missing) Flow:X
        let elements = vec![element("A", "a"), element("B", "b"), element("C", "c")];
        let records = vec![
            Deps::new(),
            deps(&[Id::new("Flow", "X")]),
            deps(&[Id::new("B", "b")]),
        ];
        let report = analyze(
            &elements,
            &[true, false, false],
            &records,
            &BTreeMap::from([(Id::new("A", "a"), 0)]),
            |_| false,
        );

        assert_eq!(report.failed, 2);
        assert_eq!(report.total, 3);
        assert_eq!(report.cascades, 1);
        assert_eq!(report.root_causes.len(), 1);
        assert_eq!(
            report.lines(),
            vec!["missing element Flow:X referenced by B:Base:b".to_string()]
        );
    }

    #[test]
    fn test_undetermined_reason() {
        let elements = vec![element("A", "a")];
        let report = analyze(&elements, &[false], &[Deps::new()], &BTreeMap::new(), |_| false);
        assert_eq!(
            report.lines(),
            vec!["A:Base:a failed for an undetermined non-dependency reason".to_string()]
        );
    }

    #[test]
    fn test_cycle_reported_as_root_cause() {
        let elements = vec![element("A", "a"), element("B", "b"), element("C", "c")];
        let records = vec![
            deps(&[Id::new("B", "b")]),
            deps(&[Id::new("A", "a")]),
            deps(&[Id::new("A", "a")]),
        ];
        let report = analyze(&elements, &[false, false, false], &records, &BTreeMap::new(), |_| {
            false
        });

        assert_eq!(report.root_causes.len(), 2);
        assert_eq!(report.cascades, 1);
        assert!(report.lines()[0].starts_with("circular dependency between A:Base:a and B:Base:b"));
    }

    #[test]
    fn test_messages_and_display() {
        let elements = vec![element("Balance", "B")];
        let mut record = deps(&[Id::new("Price", "P"), Id::new("Param", "P")]);
        record.messages.push("price must cover the balance horizon".into());
        let report = analyze(&elements, &[false], &[record], &BTreeMap::new(), |_| false);

        let text = report.to_string();
        assert!(text.starts_with("Unresolvable dependencies: 1/1 elements failed"));
        assert!(text.contains("missing element Price:P referenced by Balance:Base:B"));
        assert!(text.contains("Balance:Base:B: price must cover the balance horizon"));
        assert_eq!(report.to_diagnostics().error_count(), 3);
    }

    #[test]
    fn test_satisfied_by_storage_is_not_missing() {
        let elements = vec![element("A", "a")];
        let records = vec![deps(&[Id::new("Flow", "SlackFlowB")])];
        let report = analyze(&elements, &[false], &records, &BTreeMap::new(), |_| true);
        assert!(report.root_causes[0].missing.is_empty());
    }
}
