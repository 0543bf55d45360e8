/// Source Unit Domain Module
///
/// Defines the kinds of Apex source units apextrace analyzes.

use std::path::Path;

/// The two unit kinds discoverable by file extension convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// An Apex class file (`.cls`).
    Class,
    /// An Apex trigger file (`.trigger`).
    Trigger,
}

impl SourceKind {
    /// Infer the unit kind from a file extension.
    pub fn from_extension(ext: &str) -> Option<SourceKind> {
        match ext.to_lowercase().as_str() {
            "cls" => Some(SourceKind::Class),
            "trigger" => Some(SourceKind::Trigger),
            _ => None,
        }
    }

    /// Infer the unit kind from a file path.
    pub fn from_path(path: &Path) -> Option<SourceKind> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Get the display name of the unit kind.
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Class => "class",
            SourceKind::Trigger => "trigger",
        }
    }

    /// Get the file extension for this unit kind.
    pub fn extension(&self) -> &'static str {
        match self {
            SourceKind::Class => "cls",
            SourceKind::Trigger => "trigger",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One loaded source unit, ready for extraction.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    pub kind: SourceKind,
    pub path: String,
    pub content: String,
}
