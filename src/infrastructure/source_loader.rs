use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::domain::unit::{SourceKind, SourceUnit};

/// Directories that never contain deployable Apex source.
const SKIPPED_DIRS: [&str; 4] = [".git", ".sfdx", "node_modules", "target"];

pub struct SourceLoader;

impl SourceLoader {
    /// Load every `.cls`/`.trigger` unit under a source root.
    ///
    /// Returns units sorted by path so that downstream duplicate-name
    /// overwrites are deterministic. An unreadable root is fatal (the only
    /// hard error class before analysis); unreadable individual files are
    /// skipped with a warning.
    pub fn load_tree(root: &Path) -> Result<Vec<SourceUnit>> {
        if !root.is_dir() {
            anyhow::bail!("Source root is not a readable directory: {}", root.display());
        }

        let mut units = Vec::new();
        Self::collect_recursive(root, &mut units)?;

        units.sort_by(|a, b| a.path.cmp(&b.path));
        units.dedup_by(|a, b| a.path == b.path);
        Ok(units)
    }

    fn collect_recursive(dir: &Path, out: &mut Vec<SourceUnit>) -> Result<()> {
        let entries = fs::read_dir(dir)
            .with_context(|| format!("Failed to read directory {}", dir.display()))?;

        for entry in entries {
            let entry = entry?;
            let path = entry.path();

            if path.is_dir() {
                let skip = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| SKIPPED_DIRS.contains(&n))
                    .unwrap_or(false);
                if !skip {
                    Self::collect_recursive(&path, out)?;
                }
            } else if let Some(kind) = SourceKind::from_path(&path) {
                match fs::read_to_string(&path) {
                    Ok(content) => out.push(SourceUnit {
                        kind,
                        path: path.display().to_string(),
                        content,
                    }),
                    Err(e) => {
                        eprintln!("[apextrace] WARN: cannot read {}: {}", path.display(), e);
                    }
                }
            }
        }
        Ok(())
    }
}
