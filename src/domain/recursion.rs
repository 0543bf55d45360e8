//! Recursion Risk Detection
//!
//! Runs after all trigger contexts of an object have been expanded:
//! enumerates every elementary cycle of the traversal graph, then
//! cross-references recovered DML operations against the analyzed object.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use crate::domain::apex::DmlKind;
use crate::domain::callgraph::TraversalGraph;
use crate::domain::repository::SourceRepository;

/// A single recursion hazard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RecursionFinding {
    /// A component cycle in the traversal graph, in cycle order starting
    /// from its smallest member.
    Cycle { components: Vec<String> },
    /// A DML operation on the analyzed object inside automation reachable
    /// from that object's own triggers.
    SameObjectDml {
        class_name: String,
        method_name: String,
        operation: DmlKind,
        object_name: String,
        line: usize,
    },
}

impl std::fmt::Display for RecursionFinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecursionFinding::Cycle { components } => {
                let mut walk = components.clone();
                if let Some(first) = components.first() {
                    walk.push(first.clone());
                }
                write!(
                    f,
                    "Potential recursion cycle detected: {}",
                    walk.join(" -> ")
                )
            }
            RecursionFinding::SameObjectDml {
                class_name,
                method_name,
                operation,
                object_name,
                line,
            } => write!(
                f,
                "Potential recursion in {}.{}: {} on {} (line {})",
                class_name, method_name, operation, object_name, line
            ),
        }
    }
}

pub struct RecursionRiskDetector<'a> {
    graph: &'a TraversalGraph,
    repo: &'a SourceRepository,
}

impl<'a> RecursionRiskDetector<'a> {
    pub fn new(graph: &'a TraversalGraph, repo: &'a SourceRepository) -> Self {
        Self { graph, repo }
    }

    /// All findings for one object: cycles first, then same-object DML.
    /// `trigger_names` are the roots reachability is measured from.
    pub fn detect(&self, object_name: &str, trigger_names: &[String]) -> Vec<RecursionFinding> {
        let mut findings: Vec<RecursionFinding> = self
            .simple_cycles()
            .into_iter()
            .map(|components| RecursionFinding::Cycle { components })
            .collect();
        findings.extend(self.same_object_dml(object_name, trigger_names));
        findings
    }

    /// Every elementary cycle of the traversal graph (no repeated vertex
    /// except start = end), each reported exactly once, rooted at its
    /// lexicographically smallest member.
    ///
    /// For each start vertex the search only walks vertices that sort at
    /// or after it, so a cycle is discovered solely from its smallest
    /// member and rotations never duplicate.
    pub fn simple_cycles(&self) -> Vec<Vec<String>> {
        let mut ids: Vec<&str> = self.graph.nodes.iter().map(|n| n.id.as_str()).collect();
        ids.sort_unstable();
        let index: HashMap<&str, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        // Adjacency in sorted-index space, successors ordered for
        // deterministic output.
        let mut adjacency = vec![Vec::new(); ids.len()];
        for node in &self.graph.nodes {
            let from = index[node.id.as_str()];
            for successor in &node.successors {
                if let Some(&to) = index.get(successor.as_str()) {
                    adjacency[from].push(to);
                }
            }
            adjacency[from].sort_unstable();
        }

        let mut cycles = Vec::new();
        for start in 0..ids.len() {
            let mut path = vec![start];
            let mut on_path = vec![false; ids.len()];
            on_path[start] = true;
            Self::search(
                start,
                start,
                &adjacency,
                &mut path,
                &mut on_path,
                &mut cycles,
                &ids,
            );
        }
        cycles
    }

    fn search(
        vertex: usize,
        start: usize,
        adjacency: &[Vec<usize>],
        path: &mut Vec<usize>,
        on_path: &mut [bool],
        cycles: &mut Vec<Vec<String>>,
        ids: &[&str],
    ) {
        for &next in &adjacency[vertex] {
            if next == start {
                cycles.push(path.iter().map(|&i| ids[i].to_string()).collect());
            } else if next > start && !on_path[next] {
                path.push(next);
                on_path[next] = true;
                Self::search(next, start, adjacency, path, on_path, cycles, ids);
                path.pop();
                on_path[next] = false;
            }
        }
    }

    /// DML statements targeting the analyzed object, found in any class
    /// reachable from one of its triggers. Object names compare
    /// case-insensitively, as Apex identifiers do.
    fn same_object_dml(&self, object_name: &str, trigger_names: &[String]) -> Vec<RecursionFinding> {
        let mut reachable = BTreeSet::new();
        for trigger in trigger_names {
            reachable.extend(self.graph.reachable_from(trigger));
        }

        let mut findings = Vec::new();
        for class_name in self.repo.class_names() {
            if !reachable.contains(&class_name) {
                continue;
            }
            let Some(class) = self.repo.class(&class_name) else {
                continue;
            };
            for method in &class.methods {
                for dml in &method.data_operations {
                    if dml.object_type.eq_ignore_ascii_case(object_name) {
                        findings.push(RecursionFinding::SameObjectDml {
                            class_name: class_name.clone(),
                            method_name: method.name.clone(),
                            operation: dml.kind,
                            object_name: object_name.to_string(),
                            line: dml.line,
                        });
                    }
                }
            }
        }
        findings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::unit::{SourceKind, SourceUnit};

    fn empty_repo() -> SourceRepository {
        SourceRepository::build(&[])
    }

    fn detector_graph(edges: &[(&str, &str)]) -> TraversalGraph {
        let mut graph = TraversalGraph::default();
        for (from, to) in edges {
            graph.add_edge(from, to);
        }
        graph
    }

    #[test]
    fn test_two_cycle_reported_once() {
        let graph = detector_graph(&[("A", "B"), ("B", "A")]);
        let repo = empty_repo();
        let detector = RecursionRiskDetector::new(&graph, &repo);
        let cycles = detector.simple_cycles();
        assert_eq!(cycles, vec![vec!["A".to_string(), "B".to_string()]]);
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let graph = detector_graph(&[("A", "A")]);
        let repo = empty_repo();
        let detector = RecursionRiskDetector::new(&graph, &repo);
        assert_eq!(detector.simple_cycles(), vec![vec!["A".to_string()]]);
    }

    #[test]
    fn test_distinct_cycles_enumerated() {
        // Two elementary cycles sharing vertex B: A->B->A and B->C->B.
        let graph = detector_graph(&[("A", "B"), ("B", "A"), ("B", "C"), ("C", "B")]);
        let repo = empty_repo();
        let detector = RecursionRiskDetector::new(&graph, &repo);
        let cycles = detector.simple_cycles();
        assert_eq!(cycles.len(), 2);
        assert!(cycles.contains(&vec!["A".to_string(), "B".to_string()]));
        assert!(cycles.contains(&vec!["B".to_string(), "C".to_string()]));
    }

    #[test]
    fn test_acyclic_graph_has_no_cycles() {
        let graph = detector_graph(&[("T", "A"), ("A", "B"), ("T", "B")]);
        let repo = empty_repo();
        let detector = RecursionRiskDetector::new(&graph, &repo);
        assert!(detector.simple_cycles().is_empty());
    }

    #[test]
    fn test_same_object_dml_only_for_analyzed_object() {
        let units = vec![
            SourceUnit {
                kind: SourceKind::Class,
                path: "classes/AccountWriter.cls".to_string(),
                content: "public class AccountWriter { public void go() { insert Account; } }"
                    .to_string(),
            },
            SourceUnit {
                kind: SourceKind::Class,
                path: "classes/ContactWriter.cls".to_string(),
                content: "public class ContactWriter { public void go() { insert Contact; } }"
                    .to_string(),
            },
        ];
        let repo = SourceRepository::build(&units);
        let graph = detector_graph(&[
            ("AccountTrigger", "AccountWriter"),
            ("AccountTrigger", "ContactWriter"),
        ]);
        let detector = RecursionRiskDetector::new(&graph, &repo);

        let findings = detector.detect("Account", &["AccountTrigger".to_string()]);
        assert_eq!(findings.len(), 1);
        match &findings[0] {
            RecursionFinding::SameObjectDml {
                class_name,
                method_name,
                operation,
                object_name,
                ..
            } => {
                assert_eq!(class_name, "AccountWriter");
                assert_eq!(method_name, "go");
                assert_eq!(*operation, DmlKind::Insert);
                assert_eq!(object_name, "Account");
            }
            other => panic!("expected SameObjectDml, got {other:?}"),
        }
    }

    #[test]
    fn test_unreachable_class_not_flagged() {
        let units = vec![SourceUnit {
            kind: SourceKind::Class,
            path: "classes/AccountWriter.cls".to_string(),
            content: "public class AccountWriter { public void go() { insert Account; } }"
                .to_string(),
        }];
        let repo = SourceRepository::build(&units);
        // The writer exists but no trigger reaches it.
        let graph = detector_graph(&[("AccountTrigger", "SomethingElse")]);
        let detector = RecursionRiskDetector::new(&graph, &repo);
        assert!(detector
            .detect("Account", &["AccountTrigger".to_string()])
            .is_empty());
    }

    #[test]
    fn test_finding_display() {
        let cycle = RecursionFinding::Cycle {
            components: vec!["A".to_string(), "B".to_string()],
        };
        assert_eq!(
            cycle.to_string(),
            "Potential recursion cycle detected: A -> B -> A"
        );

        let dml = RecursionFinding::SameObjectDml {
            class_name: "AccountWriter".to_string(),
            method_name: "go".to_string(),
            operation: DmlKind::Update,
            object_name: "Account".to_string(),
            line: 12,
        };
        assert_eq!(
            dml.to_string(),
            "Potential recursion in AccountWriter.go: update on Account (line 12)"
        );
    }
}
