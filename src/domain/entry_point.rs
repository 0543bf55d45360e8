//! Entry Point Catalog Module
//!
//! Aggregates, per object, the automation entry points discovered in a
//! loaded repository. Pure aggregation, no graph work.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::apex::TriggerTiming;
use crate::domain::repository::SourceRepository;

/// One discovered automation entry point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPointRecord {
    /// Object the automation fires on
    pub object_name: String,
    /// Name of the declared trigger
    pub trigger_name: String,
    /// Timing contexts the trigger declares, in canonical order
    pub timings: Vec<TriggerTiming>,
}

impl EntryPointRecord {
    /// Human-readable form, e.g. `Trigger: AccountTrigger (before insert, after insert)`.
    pub fn describe(&self) -> String {
        let timings: Vec<&str> = self.timings.iter().map(TriggerTiming::as_str).collect();
        format!("Trigger: {} ({})", self.trigger_name, timings.join(", "))
    }
}

/// Entry points grouped by object name.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntryPointCatalog {
    by_object: BTreeMap<String, Vec<EntryPointRecord>>,
}

impl EntryPointCatalog {
    /// Catalog every trigger in the repository, keyed by target object.
    /// Records within an object sort by trigger name.
    pub fn from_repository(repo: &SourceRepository) -> Self {
        let mut by_object: BTreeMap<String, Vec<EntryPointRecord>> = BTreeMap::new();
        for name in repo.trigger_names() {
            let Some(trigger) = repo.trigger(&name) else {
                continue;
            };
            by_object
                .entry(trigger.object_name.clone())
                .or_default()
                .push(EntryPointRecord {
                    object_name: trigger.object_name.clone(),
                    trigger_name: trigger.name.clone(),
                    timings: trigger.timings.iter().copied().collect(),
                });
        }
        EntryPointCatalog { by_object }
    }

    /// Objects with at least one entry point, sorted.
    pub fn objects(&self) -> Vec<String> {
        self.by_object.keys().cloned().collect()
    }

    pub fn entries_for(&self, object_name: &str) -> &[EntryPointRecord] {
        self.by_object
            .get(object_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.by_object.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_object.is_empty()
    }
}
