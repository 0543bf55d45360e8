//! Execution Path Construction
//!
//! Expands a trigger context into a tree of execution nodes by following
//! resolved class calls, while emitting directed edges into a side graph
//! for later cycle detection.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::AnalyzerConfig;
use crate::domain::apex::{ClassDeclaration, TriggerContext};
use crate::domain::callgraph::TraversalGraph;
use crate::domain::repository::SourceRepository;
use crate::domain::resolver::{classes_referenced_in, CallGraphResolver};

/// Kinds of automation components an execution node can represent.
/// Only triggers and Apex classes are produced by source analysis; the
/// remaining kinds exist for downstream consumers of the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComponentKind {
    Trigger,
    ApexClass,
    Flow,
    ProcessBuilder,
    Workflow,
}

impl ComponentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentKind::Trigger => "trigger",
            ComponentKind::ApexClass => "apex",
            ComponentKind::Flow => "flow",
            ComponentKind::ProcessBuilder => "process_builder",
            ComponentKind::Workflow => "workflow",
        }
    }
}

/// Rendering details carried by a node when the corresponding feature
/// flags are on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeMetadata {
    pub dml_operations: Vec<String>,
    pub soql_queries: Vec<String>,
}

impl NodeMetadata {
    pub fn is_empty(&self) -> bool {
        self.dml_operations.is_empty() && self.soql_queries.is_empty()
    }
}

/// One step in a reconstructed automation call chain.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionNode {
    pub kind: ComponentKind,
    pub name: String,
    pub method: Option<String>,
    pub condition: Option<String>,
    pub children: Vec<ExecutionNode>,
    pub order: usize,
    pub metadata: NodeMetadata,
}

impl ExecutionNode {
    pub fn new(kind: ComponentKind, name: &str, order: usize) -> Self {
        Self {
            kind,
            name: name.to_string(),
            method: None,
            condition: None,
            children: Vec::new(),
            order,
            metadata: NodeMetadata::default(),
        }
    }

    /// Total node count of this subtree, root included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(ExecutionNode::size).sum::<usize>()
    }
}

/// Counters accumulated across one object's analysis. Hitting a bound is
/// silent truncation, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraversalStats {
    pub paths_built: usize,
    pub nodes_created: usize,
    pub truncated_paths: usize,
    pub node_budget_exhausted: bool,
}

/// Recursion guard for path construction.
///
/// Per-path scoping (the default) tracks only the ancestors of the node
/// being built: a name is released on backtrack, so it may legitimately
/// reappear in a sibling branch or a later trigger context. The shared
/// scope never releases names and is reused across an object's whole
/// analysis, reproducing the legacy behavior.
#[derive(Debug, Default)]
pub struct VisitedScope {
    seen: HashSet<String>,
    shared: bool,
}

impl VisitedScope {
    pub fn new(shared: bool) -> Self {
        Self {
            seen: HashSet::new(),
            shared,
        }
    }

    /// Returns false when `name` is already being visited.
    fn enter(&mut self, name: &str) -> bool {
        self.seen.insert(name.to_string())
    }

    fn leave(&mut self, name: &str) {
        if !self.shared {
            self.seen.remove(name);
        }
    }
}

pub struct ExecutionPathBuilder<'a> {
    repo: &'a SourceRepository,
    resolver: CallGraphResolver<'a>,
    config: &'a AnalyzerConfig,
}

impl<'a> ExecutionPathBuilder<'a> {
    pub fn new(repo: &'a SourceRepository, config: &'a AnalyzerConfig) -> Self {
        Self {
            repo,
            resolver: CallGraphResolver::new(repo),
            config,
        }
    }

    /// Build the execution tree for one trigger context. Returns `None`
    /// when the trigger is unknown or does not declare the timing.
    ///
    /// Every resolved candidate records a parent -> child edge in `graph`
    /// before the recursion guard is consulted, so the side graph can
    /// contain cycles even though no built path does.
    pub fn build(
        &self,
        context: &TriggerContext,
        graph: &mut TraversalGraph,
        visited: &mut VisitedScope,
        stats: &mut TraversalStats,
    ) -> Option<ExecutionNode> {
        let trigger = self.repo.trigger(&context.trigger_name)?;
        if !trigger.timings.contains(&context.timing) {
            return None;
        }

        graph.ensure_node(&trigger.name);
        let mut root = ExecutionNode::new(ComponentKind::Trigger, &trigger.name, 0);
        if self.config.include_conditions {
            root.condition = Some(context.timing.as_str().to_string());
        }
        stats.paths_built += 1;
        stats.nodes_created += 1;

        let class_names = self.repo.class_names();
        for class_name in classes_referenced_in(&trigger.body, &class_names) {
            graph.add_edge(&trigger.name, &class_name);
            if let Some(child) = self.expand_class(&class_name, 1, graph, visited, stats) {
                root.children.push(child);
            }
        }

        Some(root)
    }

    fn expand_class(
        &self,
        name: &str,
        depth: usize,
        graph: &mut TraversalGraph,
        visited: &mut VisitedScope,
        stats: &mut TraversalStats,
    ) -> Option<ExecutionNode> {
        if depth >= self.config.max_depth {
            stats.truncated_paths += 1;
            return None;
        }
        if let Some(budget) = self.config.max_nodes {
            if stats.nodes_created >= budget {
                stats.node_budget_exhausted = true;
                return None;
            }
        }
        let class = self.repo.class(name)?;
        if !visited.enter(name) {
            return None; // already an ancestor of this path
        }

        let mut node = ExecutionNode::new(ComponentKind::ApexClass, name, depth);
        node.metadata = self.node_metadata(&class);
        stats.nodes_created += 1;

        for callee in self.resolver.resolve_class_successors(&class) {
            graph.add_edge(name, &callee);
            if let Some(child) = self.expand_class(&callee, depth + 1, graph, visited, stats) {
                node.children.push(child);
            }
        }

        visited.leave(name);
        Some(node)
    }

    fn node_metadata(&self, class: &ClassDeclaration) -> NodeMetadata {
        let mut metadata = NodeMetadata::default();
        for method in &class.methods {
            if self.config.show_dml_operations {
                for dml in &method.data_operations {
                    metadata.dml_operations.push(format!(
                        "{} {} (line {})",
                        dml.kind, dml.object_type, dml.line
                    ));
                }
            }
            if self.config.show_soql_queries {
                for query in &method.queries {
                    metadata.soql_queries.push(format!(
                        "query on {} (line {})",
                        query.referenced_objects.join(", "),
                        query.line
                    ));
                }
            }
        }
        metadata
    }
}
