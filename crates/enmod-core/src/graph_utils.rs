use crate::compile::DependencyIndexMap;
use crate::element::DataElement;
use anyhow::{anyhow, Result};
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeSet, VecDeque};

/// Element dependency graph: one node per input element (weight = input
/// position), an edge `a -> b` when element `a` depended on an object
/// produced by element `b`.
pub type DependencyGraph = DiGraph<usize, ()>;

/// Summary statistics printed by `enmod graph`.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyStats {
    pub node_count: usize,
    pub edge_count: usize,
    /// Elements that depend on nothing
    pub independent: usize,
    /// Elements nothing depends on
    pub unreferenced: usize,
    pub max_in_degree: usize,
    /// Length of the longest dependency chain (edges)
    pub depth: usize,
    pub cyclic: bool,
}

pub fn dependency_graph(map: &DependencyIndexMap, element_count: usize) -> DependencyGraph {
    let mut graph = DiGraph::with_capacity(element_count, map.values().map(Vec::len).sum());
    let nodes: Vec<NodeIndex> = (0..element_count).map(|i| graph.add_node(i)).collect();
    for (&from, targets) in map {
        for &to in targets {
            if let (Some(&a), Some(&b)) = (nodes.get(from), nodes.get(to)) {
                graph.add_edge(a, b, ());
            }
        }
    }
    graph
}

/// Counts, degree extremes and chain depth of the dependency graph.
pub fn dependency_stats(graph: &DependencyGraph) -> DependencyStats {
    let independent = graph
        .node_indices()
        .filter(|&n| graph.neighbors_directed(n, Direction::Outgoing).next().is_none())
        .count();
    let unreferenced = graph
        .node_indices()
        .filter(|&n| graph.neighbors_directed(n, Direction::Incoming).next().is_none())
        .count();
    let max_in_degree = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .max()
        .unwrap_or(0);
    let cyclic = is_cyclic_directed(graph);
    DependencyStats {
        node_count: graph.node_count(),
        edge_count: graph.edge_count(),
        independent,
        unreferenced,
        max_in_degree,
        depth: if cyclic { 0 } else { longest_chain(graph) },
        cyclic,
    }
}

fn longest_chain(graph: &DependencyGraph) -> usize {
    let order = match toposort(graph, None) {
        Ok(order) => order,
        Err(_) => return 0,
    };
    // Dependencies come after dependents in topological order; walk backwards.
    let mut depth = vec![0usize; graph.node_count()];
    for &node in order.iter().rev() {
        let deepest = graph
            .neighbors_directed(node, Direction::Outgoing)
            .map(|next| depth[next.index()] + 1)
            .max()
            .unwrap_or(0);
        depth[node.index()] = deepest;
    }
    depth.into_iter().max().unwrap_or(0)
}

/// Positions of `seeds` and everything they transitively depend on.
///
/// Compiling exactly these elements reproduces the objects of the seeds.
pub fn dependency_closure(map: &DependencyIndexMap, seeds: &[usize]) -> BTreeSet<usize> {
    let mut closure = BTreeSet::new();
    let mut queue: VecDeque<usize> = seeds.iter().copied().collect();
    while let Some(position) = queue.pop_front() {
        if !closure.insert(position) {
            continue;
        }
        if let Some(targets) = map.get(&position) {
            queue.extend(targets.iter().copied().filter(|t| !closure.contains(t)));
        }
    }
    closure
}

/// Export the dependency graph to a DOT string (Graphviz).
pub fn export_graph(
    graph: &DependencyGraph,
    elements: &[DataElement],
    format: &str,
) -> Result<String> {
    match format.to_ascii_lowercase().as_str() {
        "graphviz" | "dot" => Ok(render_dot(graph, elements)),
        other => Err(anyhow!("unsupported graph export format '{other}'")),
    }
}

fn render_dot(graph: &DependencyGraph, elements: &[DataElement]) -> String {
    let mut buffer = String::new();
    buffer.push_str("digraph enmod_dependencies {\n");
    for node in graph.node_indices() {
        let position = graph[node];
        let label = elements
            .get(position)
            .map(|element| sanitize_label(&element.key.to_string()))
            .unwrap_or_else(|| position.to_string());
        buffer.push_str(&format!("  n{} [label=\"{}\"];\n", node.index(), label));
    }
    for edge in graph.edge_references() {
        let source = edge.source().index();
        let target = edge.target().index();
        buffer.push_str(&format!("  n{source} -> n{target};\n"));
    }
    buffer.push('}');
    buffer
}

fn sanitize_label(label: &str) -> String {
    label.replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Attributes;
    use std::collections::BTreeMap;

    fn chain_map() -> DependencyIndexMap {
        // 0 <- 1 <- 2, 3 independent
        BTreeMap::from([(0, vec![]), (1, vec![0]), (2, vec![1]), (3, vec![])])
    }

    #[test]
    fn test_stats_on_chain() {
        let graph = dependency_graph(&chain_map(), 4);
        let stats = dependency_stats(&graph);
        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.edge_count, 2);
        assert_eq!(stats.independent, 2);
        assert_eq!(stats.unreferenced, 2);
        assert_eq!(stats.depth, 2);
        assert!(!stats.cyclic);
    }

    #[test]
    fn test_closure_follows_transitive_dependencies() {
        let closure = dependency_closure(&chain_map(), &[2]);
        assert_eq!(closure.into_iter().collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(dependency_closure(&chain_map(), &[3]).len(), 1);
    }

    #[test]
    fn test_dot_export() {
        let elements = vec![
            DataElement::new("Flow", "BaseFlow", "F", Attributes::new()),
            DataElement::new("Arrow", "BaseArrow", "A", Attributes::new()),
        ];
        let map = BTreeMap::from([(0, vec![]), (1, vec![0])]);
        let graph = dependency_graph(&map, 2);
        let dot = export_graph(&graph, &elements, "dot").unwrap();
        assert!(dot.starts_with("digraph enmod_dependencies {"));
        assert!(dot.contains("n1 [label=\"Arrow:BaseArrow:A\"]"));
        assert!(dot.contains("n1 -> n0;"));
        assert!(export_graph(&graph, &elements, "svg").is_err());
    }
}
