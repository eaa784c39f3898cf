//! Generic directed acyclic graph.
//!
//! The index builds three of these per pack: the intra-policy identifier
//! graph, the cross-policy rule-import graph, and the shape-composition
//! graph. All three need the same two queries: find the first cycle, and
//! produce a topological order.
//!
//! Nodes are keyed by [`DagKey::key`]; edges are stored by key so the
//! graph never owns more than one copy of a node.

use std::collections::BTreeMap;

use thiserror::Error;

/// Keys a node into the graph. `String` and [`crate::fqn::Fqn`] implement
/// this out of the box.
pub trait DagKey {
    /// The node's unique key.
    fn key(&self) -> String;
}

impl DagKey for String {
    fn key(&self) -> String {
        self.clone()
    }
}

impl DagKey for &str {
    fn key(&self) -> String {
        (*self).to_string()
    }
}

impl DagKey for crate::fqn::Fqn {
    fn key(&self) -> String {
        self.to_string()
    }
}

/// Errors from graph construction and sorting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DagError {
    /// An edge endpoint was never added as a node.
    #[error("node '{0}' is not in the graph")]
    NodeMissing(String),

    /// An edge from a node to itself.
    #[error("self-loop on node '{0}'")]
    SelfLoop(String),

    /// A topological sort was requested on a cyclic graph.
    #[error("graph contains a cycle: {}", path.join(" -> "))]
    Cycle {
        /// The node keys on the cycle, in traversal order.
        path: Vec<String>,
    },
}

/// A directed graph over values of `T`, keyed by [`DagKey::key`].
#[derive(Debug, Clone, Default)]
pub struct Dag<T: DagKey> {
    nodes: BTreeMap<String, T>,
    edges: BTreeMap<String, Vec<String>>,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Visiting,
    Visited,
}

impl<T: DagKey> Dag<T> {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
        }
    }

    /// Adds a node. Re-adding the same key is a no-op.
    pub fn add_node(&mut self, node: T) {
        let key = node.key();
        self.edges.entry(key.clone()).or_default();
        self.nodes.entry(key).or_insert(node);
    }

    /// True if the key names a node in the graph.
    pub fn contains(&self, key: &str) -> bool {
        self.nodes.contains_key(key)
    }

    /// The number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True if the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds a directed edge from `src` to `dst`.
    ///
    /// Fails on self-loops and when either endpoint is missing.
    pub fn add_edge(&mut self, src: &T, dst: &T) -> Result<(), DagError> {
        let (src, dst) = (src.key(), dst.key());
        if src == dst {
            return Err(DagError::SelfLoop(src));
        }
        if !self.nodes.contains_key(&src) {
            return Err(DagError::NodeMissing(src));
        }
        if !self.nodes.contains_key(&dst) {
            return Err(DagError::NodeMissing(dst));
        }
        let out = self.edges.entry(src).or_default();
        if !out.contains(&dst) {
            out.push(dst);
        }
        Ok(())
    }

    /// Finds the first cycle reachable in key order.
    ///
    /// Returns the keys along the cycle, from the first re-encountered
    /// node to the node that closed the loop; empty when acyclic.
    pub fn detect_first_cycle(&self) -> Vec<String> {
        let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
        let mut stack: Vec<&str> = Vec::new();

        for start in self.nodes.keys() {
            if marks.contains_key(start.as_str()) {
                continue;
            }
            if let Some(cycle) = self.dfs_cycle(start, &mut marks, &mut stack) {
                return cycle;
            }
        }
        Vec::new()
    }

    fn dfs_cycle<'a>(
        &'a self,
        node: &'a str,
        marks: &mut BTreeMap<&'a str, Mark>,
        stack: &mut Vec<&'a str>,
    ) -> Option<Vec<String>> {
        marks.insert(node, Mark::Visiting);
        stack.push(node);

        if let Some(next) = self.edges.get(node) {
            for dst in next {
                match marks.get(dst.as_str()) {
                    Some(Mark::Visited) => {}
                    Some(Mark::Visiting) => {
                        // The cycle runs from the first encounter of `dst`
                        // on the stack through the current node.
                        let from = stack.iter().position(|k| *k == dst.as_str()).unwrap_or(0);
                        let mut path: Vec<String> =
                            stack[from..].iter().map(|k| (*k).to_string()).collect();
                        path.push(dst.clone());
                        return Some(path);
                    }
                    None => {
                        if let Some(cycle) = self.dfs_cycle(dst, marks, stack) {
                            return Some(cycle);
                        }
                    }
                }
            }
        }

        stack.pop();
        marks.insert(node, Mark::Visited);
        None
    }

    /// Produces a topological order of node keys: every node appears
    /// before the nodes it has edges to.
    ///
    /// Fails with [`DagError::Cycle`] on a cyclic graph.
    pub fn topo_sort(&self) -> Result<Vec<String>, DagError> {
        let cycle = self.detect_first_cycle();
        if !cycle.is_empty() {
            return Err(DagError::Cycle { path: cycle });
        }

        let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
        let mut order: Vec<String> = Vec::new();
        for start in self.nodes.keys() {
            self.dfs_post(start, &mut marks, &mut order);
        }
        order.reverse();
        Ok(order)
    }

    fn dfs_post<'a>(
        &'a self,
        node: &'a str,
        marks: &mut BTreeMap<&'a str, Mark>,
        order: &mut Vec<String>,
    ) {
        if marks.contains_key(node) {
            return;
        }
        marks.insert(node, Mark::Visiting);
        if let Some(next) = self.edges.get(node) {
            for dst in next {
                self.dfs_post(dst, marks, order);
            }
        }
        marks.insert(node, Mark::Visited);
        order.push(node.to_string());
    }

    /// Looks up a node by key.
    pub fn node(&self, key: &str) -> Option<&T> {
        self.nodes.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(edges: &[(&str, &str)]) -> Dag<String> {
        let mut dag = Dag::new();
        for (src, dst) in edges {
            dag.add_node(src.to_string());
            dag.add_node(dst.to_string());
        }
        for (src, dst) in edges {
            dag.add_edge(&src.to_string(), &dst.to_string()).unwrap();
        }
        dag
    }

    #[test]
    fn test_add_edge_requires_nodes() {
        let mut dag: Dag<String> = Dag::new();
        dag.add_node("a".to_string());
        let err = dag.add_edge(&"a".to_string(), &"b".to_string());
        assert_eq!(err, Err(DagError::NodeMissing("b".to_string())));
    }

    #[test]
    fn test_self_loop_rejected() {
        let mut dag: Dag<String> = Dag::new();
        dag.add_node("a".to_string());
        let err = dag.add_edge(&"a".to_string(), &"a".to_string());
        assert_eq!(err, Err(DagError::SelfLoop("a".to_string())));
    }

    #[test]
    fn test_acyclic_graph_has_no_cycle() {
        let dag = graph(&[("a", "b"), ("b", "c"), ("a", "c")]);
        assert!(dag.detect_first_cycle().is_empty());
    }

    #[test]
    fn test_cycle_detection() {
        let dag = graph(&[("a", "b"), ("b", "c"), ("c", "a")]);
        let cycle = dag.detect_first_cycle();
        assert!(!cycle.is_empty());
        // The path closes on its first node.
        assert_eq!(cycle.first(), cycle.last());
        assert!(cycle.contains(&"a".to_string()));
        assert!(cycle.contains(&"b".to_string()));
        assert!(cycle.contains(&"c".to_string()));
    }

    #[test]
    fn test_two_node_cycle_path() {
        let dag = graph(&[("a", "b"), ("b", "a")]);
        let cycle = dag.detect_first_cycle();
        assert_eq!(cycle, vec!["a", "b", "a"]);
    }

    #[test]
    fn test_topo_sort_orders_dependencies() {
        let dag = graph(&[("app", "lib"), ("lib", "core"), ("app", "core")]);
        let order = dag.topo_sort().unwrap();
        let pos = |k: &str| order.iter().position(|o| o == k).unwrap();
        assert!(pos("app") < pos("lib"));
        assert!(pos("lib") < pos("core"));
    }

    #[test]
    fn test_topo_sort_rejects_cycle() {
        let dag = graph(&[("a", "b"), ("b", "a")]);
        assert!(matches!(dag.topo_sort(), Err(DagError::Cycle { .. })));
    }

    #[test]
    fn test_readding_node_is_idempotent() {
        let mut dag: Dag<String> = Dag::new();
        dag.add_node("a".to_string());
        dag.add_node("a".to_string());
        assert_eq!(dag.len(), 1);
    }
}
