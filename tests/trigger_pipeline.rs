/// End-to-end pipeline tests: on-disk Apex trees through loader,
/// repository, path builder and recursion detection.

use std::fs;
use std::path::Path;

use tempfile::tempdir;

use apextrace::config::AnalyzerConfig;
use apextrace::domain::analysis::{analyze_object, AnalysisResult};
use apextrace::domain::apex::TriggerTiming;
use apextrace::domain::recursion::RecursionFinding;
use apextrace::domain::repository::SourceRepository;
use apextrace::infrastructure::SourceLoader;

/// Helper to lay out a source tree and analyze one object.
fn analyze_tree(files: &[(&str, &str)], object: &str, config: &AnalyzerConfig) -> AnalysisResult {
    let dir = tempdir().unwrap();
    for (rel, content) in files {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
    }

    let units = SourceLoader::load_tree(dir.path()).unwrap();
    let repo = SourceRepository::build(&units);
    analyze_object(&repo, config, object)
}

#[test]
fn test_mutual_call_cycle_reported_once() {
    let result = analyze_tree(
        &[
            (
                "triggers/AccountTrigger.trigger",
                "trigger AccountTrigger on Account (before insert) { CycleA.go(Trigger.new); }",
            ),
            (
                "classes/CycleA.cls",
                "public class CycleA { public static void go(List<Account> accs) { CycleB.go(accs); } }",
            ),
            (
                "classes/CycleB.cls",
                "public class CycleB { public static void go(List<Account> accs) { CycleA.go(accs); } }",
            ),
        ],
        "Account",
        &AnalyzerConfig::default(),
    );

    let cycles: Vec<&RecursionFinding> = result
        .recursion_risks
        .iter()
        .filter(|f| matches!(f, RecursionFinding::Cycle { .. }))
        .collect();
    assert_eq!(cycles.len(), 1, "expected exactly one elementary cycle");
    match cycles[0] {
        RecursionFinding::Cycle { components } => {
            assert_eq!(components, &["CycleA".to_string(), "CycleB".to_string()]);
        }
        other => panic!("unexpected finding {other:?}"),
    }
}

#[test]
fn test_same_object_insert_flagged_other_object_not() {
    let files = [
        (
            "triggers/AccountTrigger.trigger",
            "trigger AccountTrigger on Account (after insert) { AccountHandler.handle(); }",
        ),
        (
            "classes/AccountHandler.cls",
            "public class AccountHandler { public void handle() { insert Account; } }",
        ),
    ];
    let result = analyze_tree(&files, "Account", &AnalyzerConfig::default());
    assert!(result.has_recursion_risks());
    let rendered: Vec<String> = result
        .recursion_risks
        .iter()
        .map(ToString::to_string)
        .collect();
    assert!(
        rendered
            .iter()
            .any(|r| r.contains("AccountHandler.handle: insert on Account")),
        "missing same-object finding in {rendered:?}"
    );

    // The identical shape writing a different object raises nothing.
    let contact_files = [
        (
            "triggers/AccountTrigger.trigger",
            "trigger AccountTrigger on Account (after insert) { AccountHandler.handle(); }",
        ),
        (
            "classes/AccountHandler.cls",
            "public class AccountHandler { public void handle() { insert Contact; } }",
        ),
    ];
    let clean = analyze_tree(&contact_files, "Account", &AnalyzerConfig::default());
    assert!(
        !clean.has_recursion_risks(),
        "unexpected findings: {:?}",
        clean.recursion_risks
    );
}

#[test]
fn test_entry_points_cover_all_triggers() {
    let result = analyze_tree(
        &[
            (
                "triggers/AccountAudit.trigger",
                "trigger AccountAudit on Account (after update, after delete) {}",
            ),
            (
                "triggers/AccountMain.trigger",
                "trigger AccountMain on Account (before insert) {}",
            ),
        ],
        "Account",
        &AnalyzerConfig::default(),
    );

    assert_eq!(result.entry_points.len(), 2);
    assert_eq!(result.entry_points[0].name, "AccountAudit");
    assert_eq!(result.entry_points[1].name, "AccountMain");
    assert_eq!(
        result.entry_points[0].condition.as_deref(),
        Some("after update, after delete")
    );

    assert_eq!(result.paths_for(TriggerTiming::BeforeInsert).len(), 1);
    assert_eq!(result.paths_for(TriggerTiming::AfterUpdate).len(), 1);
    assert_eq!(result.paths_for(TriggerTiming::AfterDelete).len(), 1);
}

#[test]
fn test_deep_chain_truncates_at_bound() {
    // A0 -> A1 -> ... -> A11, far past max_depth.
    let mut sources: Vec<(String, String)> = vec![(
        "triggers/ChainTrigger.trigger".to_string(),
        "trigger ChainTrigger on Account (before insert) { A0.go(); }".to_string(),
    )];
    for i in 0..11 {
        sources.push((
            format!("classes/A{i}.cls"),
            format!(
                "public class A{i} {{ public static void go() {{ A{}.go(); }} }}",
                i + 1
            ),
        ));
    }
    sources.push((
        "classes/A11.cls".to_string(),
        "public class A11 { public static void go() {} }".to_string(),
    ));
    let files: Vec<(&str, &str)> = sources
        .iter()
        .map(|(p, c)| (p.as_str(), c.as_str()))
        .collect();

    let config = AnalyzerConfig {
        max_depth: 5,
        ..Default::default()
    };
    let result = analyze_tree(&files, "Account", &config);

    let root = &result.paths_for(TriggerTiming::BeforeInsert)[0];
    assert_eq!(root.size(), 5, "path must hold exactly max_depth nodes");
    assert_eq!(result.metadata.truncated_paths, 1);
    assert!(!result.metadata.node_budget_exhausted);
}

#[test]
fn test_pipeline_idempotent_across_runs() {
    let files = [
        (
            "triggers/AccountTrigger.trigger",
            "trigger AccountTrigger on Account (before insert, after update) { Router.route(); }",
        ),
        (
            "classes/Router.cls",
            "public class Router { public void route() { StepOne.run(); StepTwo.run(); } }",
        ),
        (
            "classes/StepOne.cls",
            "public class StepOne { public static void run() { update Account; } }",
        ),
        (
            "classes/StepTwo.cls",
            "public class StepTwo { public static void run() { Router.route(); } }",
        ),
    ];

    let first = analyze_tree(&files, "Account", &AnalyzerConfig::default());
    let second = analyze_tree(&files, "Account", &AnalyzerConfig::default());

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_malformed_units_do_not_poison_tree() {
    let result = analyze_tree(
        &[
            ("classes/Broken.cls", "public class Broken {"),
            ("classes/Junk.cls", "this is not apex at all"),
            (
                "classes/Good.cls",
                "public class Good { public void run() {} }",
            ),
            (
                "triggers/GoodTrigger.trigger",
                "trigger GoodTrigger on Account (before insert) { Good.run(); }",
            ),
        ],
        "Account",
        &AnalyzerConfig::default(),
    );

    assert_eq!(result.metadata.classes_loaded, 1);
    assert_eq!(result.metadata.triggers_loaded, 1);
    let root = &result.paths_for(TriggerTiming::BeforeInsert)[0];
    assert_eq!(root.children.len(), 1);
    assert_eq!(root.children[0].name, "Good");
}

#[test]
fn test_missing_root_is_fatal() {
    assert!(SourceLoader::load_tree(Path::new("/definitely/not/here")).is_err());
}
