//! Call Resolution Module
//!
//! Links recovered call-site identifiers to known classes. Resolution is
//! exact-match only: an identifier that does not name an indexed class is a
//! resolution miss, silently excluded from the path.

use crate::domain::apex::{ClassDeclaration, MethodDeclaration};
use crate::domain::repository::SourceRepository;

pub struct CallGraphResolver<'a> {
    repo: &'a SourceRepository,
}

impl<'a> CallGraphResolver<'a> {
    pub fn new(repo: &'a SourceRepository) -> Self {
        Self { repo }
    }

    /// Which of this method's call identifiers name a known class.
    /// Sorted (the identifier set is ordered) and deduped by construction.
    pub fn resolve_calls(&self, method: &MethodDeclaration) -> Vec<String> {
        method
            .calls
            .iter()
            .filter(|name| self.repo.contains_class(name))
            .cloned()
            .collect()
    }

    /// Every known class any method of `class` calls into, sorted and
    /// deduped. Self-references are not successors.
    pub fn resolve_class_successors(&self, class: &ClassDeclaration) -> Vec<String> {
        let mut successors: Vec<String> = Vec::new();
        for method in &class.methods {
            for name in self.resolve_calls(method) {
                if name != class.name && !successors.contains(&name) {
                    successors.push(name);
                }
            }
        }
        successors.sort();
        successors
    }
}

/// Trigger -> class linking heuristic: a class name occurring anywhere in
/// the raw text is treated as "called", including inside comments or string
/// literals. Accepted imprecision, kept standalone so it can be replaced by
/// identifier-boundary matching without touching the path builder.
pub fn classes_referenced_in(text: &str, class_names: &[String]) -> Vec<String> {
    class_names
        .iter()
        .filter(|name| text.contains(name.as_str()))
        .cloned()
        .collect()
}
