//! Mermaid Diagram Exporter
//!
//! Renders execution-path forests as Mermaid `graph TD` diagrams with
//! per-kind styling, for embedding in generated documentation.

use std::collections::HashSet;
use std::path::Path;

use crate::config::AnalyzerConfig;
use crate::domain::analysis::AnalysisResult;
use crate::domain::apex::TriggerTiming;
use crate::domain::execution::{ComponentKind, ExecutionNode};
use crate::ports::ResultExporter;

pub struct MermaidExporter {
    include_conditions: bool,
    show_dml: bool,
    show_soql: bool,
}

impl MermaidExporter {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            include_conditions: config.include_conditions,
            show_dml: config.show_dml_operations,
            show_soql: config.show_soql_queries,
        }
    }

    /// Render one trigger context, or every context when `timing` is `None`.
    pub fn to_mermaid(&self, result: &AnalysisResult, timing: Option<TriggerTiming>) -> String {
        let mut lines = vec!["graph TD".to_string()];
        let mut processed = HashSet::new();

        match timing {
            Some(timing) => {
                for node in result.paths_for(timing) {
                    self.process_node(node, &mut processed, &mut lines);
                }
            }
            None => {
                for forest in result.execution_paths.values() {
                    for node in forest {
                        self.process_node(node, &mut processed, &mut lines);
                    }
                }
            }
        }

        lines.extend(self.styling(&processed));
        lines.join("\n    ")
    }

    fn process_node(
        &self,
        node: &ExecutionNode,
        processed: &mut HashSet<String>,
        lines: &mut Vec<String>,
    ) {
        let node_id = Self::node_id(node);
        if processed.insert(node_id.clone()) {
            let mut label = vec![node.name.clone(), format!("({})", node.kind.as_str())];
            if self.include_conditions {
                if let Some(condition) = &node.condition {
                    label.push(format!("Conditions:<br/>{condition}"));
                }
            }
            if self.show_dml && !node.metadata.dml_operations.is_empty() {
                label.push(format!(
                    "DML:<br/>{}",
                    node.metadata.dml_operations.join("<br/>")
                ));
            }
            if self.show_soql && !node.metadata.soql_queries.is_empty() {
                label.push(format!(
                    "SOQL:<br/>{}",
                    node.metadata.soql_queries.join("<br/>")
                ));
            }
            lines.push(format!(
                "{}[\"{}\"]",
                node_id,
                Self::escape_label(&label.join("|"))
            ));

            for child in &node.children {
                lines.push(format!("{} --> {}", node_id, Self::node_id(child)));
                self.process_node(child, processed, lines);
            }
        }
    }

    fn node_id(node: &ExecutionNode) -> String {
        format!("{}_{}", node.kind.as_str(), node.name)
    }

    /// Color palette per automation kind; chosen for contrast against the
    /// default Mermaid theme.
    fn styling(&self, processed: &HashSet<String>) -> Vec<String> {
        let mut lines = vec![
            "classDef trigger fill:#f96,stroke:#333,stroke-width:2px".to_string(),
            "classDef flow fill:#9cf,stroke:#333,stroke-width:2px".to_string(),
            "classDef process_builder fill:#9f9,stroke:#333,stroke-width:2px".to_string(),
            "classDef workflow fill:#f9f,stroke:#333,stroke-width:2px".to_string(),
            "classDef apex fill:#ff9,stroke:#333,stroke-width:2px".to_string(),
        ];
        for kind in [
            ComponentKind::Trigger,
            ComponentKind::Flow,
            ComponentKind::ProcessBuilder,
            ComponentKind::Workflow,
            ComponentKind::ApexClass,
        ] {
            let prefix = format!("{}_", kind.as_str());
            let mut ids: Vec<&str> = processed
                .iter()
                .filter(|id| id.starts_with(&prefix))
                .map(String::as_str)
                .collect();
            ids.sort_unstable();
            if !ids.is_empty() {
                lines.push(format!("class {} {}", ids.join(","), kind.as_str()));
            }
        }
        lines
    }

    fn escape_label(label: &str) -> String {
        label.replace('"', "#quot;")
    }
}

impl ResultExporter for MermaidExporter {
    fn export(&self, result: &AnalysisResult, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_mermaid(result, None))
    }

    fn extension(&self) -> &'static str {
        "mmd"
    }
}
