//! Per-object analysis orchestration and its result shape.
//!
//! `analyze_object` walks every trigger context of one object through the
//! path builder, then runs recursion detection once over the accumulated
//! traversal graph. The `AnalysisResult` is the crate's only contract with
//! rendering and documentation consumers.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::AnalyzerConfig;
use crate::domain::apex::{TriggerContext, TriggerTiming};
use crate::domain::callgraph::TraversalGraph;
use crate::domain::entry_point::EntryPointCatalog;
use crate::domain::execution::{
    ComponentKind, ExecutionNode, ExecutionPathBuilder, TraversalStats, VisitedScope,
};
use crate::domain::recursion::{RecursionFinding, RecursionRiskDetector};
use crate::domain::repository::SourceRepository;

/// Counters and truncation facts recorded alongside the paths. Exceeding a
/// traversal bound is not an error; it lands here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisMetadata {
    pub classes_loaded: usize,
    pub triggers_loaded: usize,
    pub paths_built: usize,
    pub nodes_created: usize,
    pub truncated_paths: usize,
    pub node_budget_exhausted: bool,
}

/// Complete analysis output for one object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub object_name: String,
    pub entry_points: Vec<ExecutionNode>,
    pub execution_paths: BTreeMap<TriggerTiming, Vec<ExecutionNode>>,
    pub recursion_risks: Vec<RecursionFinding>,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResult {
    pub fn paths_for(&self, timing: TriggerTiming) -> &[ExecutionNode] {
        self.execution_paths
            .get(&timing)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_recursion_risks(&self) -> bool {
        !self.recursion_risks.is_empty()
    }
}

/// Analyze every trigger context of `object_name` against the repository.
/// Deterministic for a fixed repository: timings iterate in canonical
/// order, triggers by name, candidates in sorted order.
pub fn analyze_object(
    repo: &SourceRepository,
    config: &AnalyzerConfig,
    object_name: &str,
) -> AnalysisResult {
    let builder = ExecutionPathBuilder::new(repo, config);
    let mut graph = TraversalGraph::default();
    let mut visited = VisitedScope::new(config.shared_visited_scope);
    let mut stats = TraversalStats::default();

    let triggers = repo.triggers_for_object(object_name);
    let mut execution_paths: BTreeMap<TriggerTiming, Vec<ExecutionNode>> = BTreeMap::new();

    for timing in TriggerTiming::ALL {
        let mut forest = Vec::new();
        for trigger in &triggers {
            if !trigger.timings.contains(&timing) {
                continue;
            }
            let context = TriggerContext {
                object_name: object_name.to_string(),
                timing,
                trigger_name: trigger.name.clone(),
            };
            if let Some(root) = builder.build(&context, &mut graph, &mut visited, &mut stats) {
                forest.push(root);
            }
        }
        if !forest.is_empty() {
            execution_paths.insert(timing, forest);
        }
    }

    let trigger_names: Vec<String> = triggers.iter().map(|t| t.name.clone()).collect();
    let recursion_risks = RecursionRiskDetector::new(&graph, repo).detect(object_name, &trigger_names);

    let catalog = EntryPointCatalog::from_repository(repo);
    let entry_points = catalog
        .entries_for(object_name)
        .iter()
        .map(|record| {
            let mut node = ExecutionNode::new(ComponentKind::Trigger, &record.trigger_name, 0);
            if config.include_conditions {
                let timings: Vec<&str> = record.timings.iter().map(|t| t.as_str()).collect();
                node.condition = Some(timings.join(", "));
            }
            node
        })
        .collect();

    AnalysisResult {
        object_name: object_name.to_string(),
        entry_points,
        execution_paths,
        recursion_risks,
        metadata: AnalysisMetadata {
            classes_loaded: repo.class_count(),
            triggers_loaded: repo.trigger_count(),
            paths_built: stats.paths_built,
            nodes_created: stats.nodes_created,
            truncated_paths: stats.truncated_paths,
            node_budget_exhausted: stats.node_budget_exhausted,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::unit::{SourceKind, SourceUnit};

    fn unit(kind: SourceKind, path: &str, content: &str) -> SourceUnit {
        SourceUnit {
            kind,
            path: path.to_string(),
            content: content.to_string(),
        }
    }

    fn sample_units() -> Vec<SourceUnit> {
        vec![
            unit(
                SourceKind::Trigger,
                "triggers/AccountTrigger.trigger",
                "trigger AccountTrigger on Account (before insert, after update) { AccountService.sync(Trigger.new); }",
            ),
            unit(
                SourceKind::Class,
                "classes/AccountService.cls",
                "public class AccountService { public static void sync(List<Account> accs) { AccountDao.save(accs); } }",
            ),
            unit(
                SourceKind::Class,
                "classes/AccountDao.cls",
                "public class AccountDao { public static void save(List<Account> accs) { update Account; AccountService.sync(accs); } }",
            ),
        ]
    }

    #[test]
    fn test_analyze_object_end_to_end() {
        let repo = SourceRepository::build(&sample_units());
        let config = AnalyzerConfig::default();
        let result = analyze_object(&repo, &config, "Account");

        assert_eq!(result.object_name, "Account");
        assert_eq!(result.entry_points.len(), 1);
        assert_eq!(result.entry_points[0].name, "AccountTrigger");
        assert_eq!(
            result.entry_points[0].condition.as_deref(),
            Some("before insert, after update")
        );

        // Both declared contexts produce a path; the other five are absent.
        assert_eq!(result.execution_paths.len(), 2);
        assert_eq!(result.paths_for(TriggerTiming::BeforeInsert).len(), 1);
        assert_eq!(result.paths_for(TriggerTiming::AfterUpdate).len(), 1);
        assert!(result.paths_for(TriggerTiming::BeforeDelete).is_empty());

        // AccountService <-> AccountDao cycle plus the same-object update.
        assert!(result.has_recursion_risks());
        let rendered: Vec<String> = result
            .recursion_risks
            .iter()
            .map(ToString::to_string)
            .collect();
        assert!(rendered
            .iter()
            .any(|r| r.contains("AccountDao -> AccountService -> AccountDao")));
        assert!(rendered
            .iter()
            .any(|r| r.contains("AccountDao.save: update on Account")));

        assert_eq!(result.metadata.classes_loaded, 2);
        assert_eq!(result.metadata.triggers_loaded, 1);
        assert_eq!(result.metadata.paths_built, 2);
    }

    #[test]
    fn test_second_context_keeps_full_path() {
        // Per-path scoping: the after-update expansion must not be starved
        // by names visited during before-insert.
        let repo = SourceRepository::build(&sample_units());
        let config = AnalyzerConfig::default();
        let result = analyze_object(&repo, &config, "Account");

        let before = &result.paths_for(TriggerTiming::BeforeInsert)[0];
        let after = &result.paths_for(TriggerTiming::AfterUpdate)[0];
        assert_eq!(before.size(), after.size());
        assert!(after.size() >= 3, "trigger -> service -> dao expected");
    }

    #[test]
    fn test_shared_scope_starves_later_contexts() {
        let repo = SourceRepository::build(&sample_units());
        let config = AnalyzerConfig {
            shared_visited_scope: true,
            ..Default::default()
        };
        let result = analyze_object(&repo, &config, "Account");

        let before = &result.paths_for(TriggerTiming::BeforeInsert)[0];
        let after = &result.paths_for(TriggerTiming::AfterUpdate)[0];
        assert!(before.size() > after.size());
    }

    #[test]
    fn test_object_without_triggers_is_empty() {
        let repo = SourceRepository::build(&sample_units());
        let config = AnalyzerConfig::default();
        let result = analyze_object(&repo, &config, "Lead");
        assert!(result.entry_points.is_empty());
        assert!(result.execution_paths.is_empty());
        assert!(!result.has_recursion_risks());
        assert_eq!(result.metadata.paths_built, 0);
    }

    #[test]
    fn test_idempotent_runs() {
        let units = sample_units();
        let config = AnalyzerConfig::default();

        let first = analyze_object(&SourceRepository::build(&units), &config, "Account");
        let second = analyze_object(&SourceRepository::build(&units), &config, "Account");
        assert_eq!(first, second);

        let first_json = serde_json::to_string(&first).unwrap();
        let second_json = serde_json::to_string(&second).unwrap();
        assert_eq!(first_json, second_json);
    }
}
