// Traversal graph for apextrace.
// Records directed component-to-component edges discovered while building
// execution paths. Used only for cycle detection and reachability; the
// execution trees themselves are kept separately.

use std::collections::BTreeSet;

/// A node in the traversal graph.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub id: String,              // component name (trigger or class)
    pub successors: Vec<String>, // component names this node leads to
}

/// The traversal side graph. May legitimately contain cycles even though
/// no single execution path is infinite.
#[derive(Debug, Clone, Default)]
pub struct TraversalGraph {
    pub nodes: Vec<GraphNode>,
}

impl TraversalGraph {
    /// Add a node if it is not already present.
    pub fn ensure_node(&mut self, id: &str) {
        if !self.nodes.iter().any(|n| n.id == id) {
            self.nodes.push(GraphNode {
                id: id.to_string(),
                successors: Vec::new(),
            });
        }
    }

    /// Record a directed edge, creating both endpoints as needed.
    /// Duplicate edges collapse to one.
    pub fn add_edge(&mut self, from: &str, to: &str) {
        self.ensure_node(from);
        self.ensure_node(to);
        if let Some(node) = self.nodes.iter_mut().find(|n| n.id == from) {
            if !node.successors.iter().any(|s| s == to) {
                node.successors.push(to.to_string());
            }
        }
    }

    pub fn successors(&self, id: &str) -> &[String] {
        self.nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.successors.as_slice())
            .unwrap_or(&[])
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.successors.len()).sum()
    }

    /// Every node reachable from `start`, including `start` itself when it
    /// exists in the graph.
    pub fn reachable_from(&self, start: &str) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        if !self.nodes.iter().any(|n| n.id == start) {
            return seen;
        }
        let mut stack = vec![start.to_string()];
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            for next in self.successors(&id) {
                if !seen.contains(next) {
                    stack.push(next.clone());
                }
            }
        }
        seen
    }
}
