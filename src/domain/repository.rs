use dashmap::DashMap;
use rayon::prelude::*;

use crate::domain::apex::{ClassDeclaration, TriggerDeclaration};
use crate::domain::extractor::EntityExtractor;
use crate::domain::unit::{SourceKind, SourceUnit};

enum Extracted {
    Class(ClassDeclaration),
    Trigger(TriggerDeclaration),
}

/// In-memory index of every class and trigger recovered from a source tree.
/// Thread-safe for concurrent reads during multi-context analysis.
pub struct SourceRepository {
    classes: DashMap<String, ClassDeclaration>,
    triggers: DashMap<String, TriggerDeclaration>,
}

impl SourceRepository {
    /// Extract every unit in parallel and index the successes by name.
    ///
    /// The caller provides units in sorted path order; insertion happens
    /// sequentially in that order, so a duplicate name overwrites its
    /// predecessor deterministically (last path wins) instead of racing.
    /// Units that fail to match a class/trigger header are soft misses and
    /// simply produce no entry.
    pub fn build(units: &[SourceUnit]) -> Self {
        let extracted: Vec<Option<Extracted>> = units
            .par_iter()
            .map(|unit| match unit.kind {
                SourceKind::Class => {
                    EntityExtractor::extract_class(&unit.content, &unit.path).map(Extracted::Class)
                }
                SourceKind::Trigger => {
                    EntityExtractor::extract_trigger(&unit.content).map(Extracted::Trigger)
                }
            })
            .collect();

        let repo = SourceRepository {
            classes: DashMap::new(),
            triggers: DashMap::new(),
        };
        for item in extracted.into_iter().flatten() {
            match item {
                Extracted::Class(class) => {
                    repo.classes.insert(class.name.clone(), class);
                }
                Extracted::Trigger(trigger) => {
                    repo.triggers.insert(trigger.name.clone(), trigger);
                }
            }
        }
        repo
    }

    /// Returns cloned declarations to avoid holding map locks.
    pub fn class(&self, name: &str) -> Option<ClassDeclaration> {
        self.classes.get(name).map(|r| r.clone())
    }

    pub fn trigger(&self, name: &str) -> Option<TriggerDeclaration> {
        self.triggers.get(name).map(|r| r.clone())
    }

    pub fn contains_class(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    /// Sorted for deterministic iteration.
    pub fn class_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.classes.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    pub fn trigger_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.triggers.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    /// Triggers declared on `object_name`, sorted by trigger name.
    pub fn triggers_for_object(&self, object_name: &str) -> Vec<TriggerDeclaration> {
        let mut triggers: Vec<TriggerDeclaration> = self
            .triggers
            .iter()
            .filter(|r| r.object_name == object_name)
            .map(|r| r.clone())
            .collect();
        triggers.sort_by(|a, b| a.name.cmp(&b.name));
        triggers
    }

    /// Every object that has at least one trigger, sorted and deduped.
    pub fn objects_with_triggers(&self) -> Vec<String> {
        let mut objects: Vec<String> = self
            .triggers
            .iter()
            .map(|r| r.object_name.clone())
            .collect();
        objects.sort();
        objects.dedup();
        objects
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn trigger_count(&self) -> usize {
        self.triggers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class_unit(path: &str, name: &str, body: &str) -> SourceUnit {
        SourceUnit {
            kind: SourceKind::Class,
            path: path.to_string(),
            content: format!("public class {name} {{ {body} }}"),
        }
    }

    fn trigger_unit(path: &str, source: &str) -> SourceUnit {
        SourceUnit {
            kind: SourceKind::Trigger,
            path: path.to_string(),
            content: source.to_string(),
        }
    }

    #[test]
    fn test_build_indexes_by_name() {
        let units = vec![
            class_unit("classes/A.cls", "A", "public void run() {}"),
            trigger_unit(
                "triggers/T.trigger",
                "trigger T on Account (before insert) {}",
            ),
        ];
        let repo = SourceRepository::build(&units);
        assert_eq!(repo.class_count(), 1);
        assert_eq!(repo.trigger_count(), 1);
        assert!(repo.contains_class("A"));
        assert_eq!(repo.trigger("T").unwrap().object_name, "Account");
        assert_eq!(repo.objects_with_triggers(), vec!["Account".to_string()]);
    }

    #[test]
    fn test_soft_miss_produces_no_entry() {
        let units = vec![
            class_unit("classes/A.cls", "A", ""),
            SourceUnit {
                kind: SourceKind::Class,
                path: "classes/Broken.cls".to_string(),
                content: "this is not apex".to_string(),
            },
        ];
        let repo = SourceRepository::build(&units);
        assert_eq!(repo.class_count(), 1);
    }

    #[test]
    fn test_duplicate_name_last_path_wins() {
        // Same class name in two files: the later path overwrites.
        let units = vec![
            class_unit("a/Service.cls", "Service", "public void first() {}"),
            class_unit("b/Service.cls", "Service", "public void second() {}"),
        ];
        let repo = SourceRepository::build(&units);
        assert_eq!(repo.class_count(), 1);
        let class = repo.class("Service").unwrap();
        assert_eq!(class.methods[0].name, "second");
    }

    #[test]
    fn test_triggers_for_object_sorted() {
        let units = vec![
            trigger_unit("t/B.trigger", "trigger B on Account (after insert) {}"),
            trigger_unit("t/A.trigger", "trigger A on Account (before insert) {}"),
            trigger_unit("t/C.trigger", "trigger C on Contact (before update) {}"),
        ];
        let repo = SourceRepository::build(&units);
        let on_account = repo.triggers_for_object("Account");
        let names: Vec<&str> = on_account.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
    }
}
