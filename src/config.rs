//! Analyzer configuration.
//!
//! Plain values consumed at the core's boundary. The CLI may populate them
//! from a TOML file, but the core never reads configuration files itself.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Maximum traversal depth for execution-path expansion.
    pub max_depth: usize,
    /// Optional hard cap on created execution nodes per object analysis,
    /// to bound pathological inputs. `None` means unbounded.
    pub max_nodes: Option<usize>,
    /// Retain trigger-context conditions on nodes for downstream rendering.
    pub include_conditions: bool,
    /// Retain DML operation summaries in node metadata.
    pub show_dml_operations: bool,
    /// Retain SOQL query summaries in node metadata.
    pub show_soql_queries: bool,
    /// Share one visited set across all trigger contexts of an object
    /// instead of scoping it to each path construction. Off by default:
    /// sharing can drop legitimate entry points from the second context
    /// onward. Kept as a switch for comparison against the legacy behavior.
    pub shared_visited_scope: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            max_nodes: None,
            include_conditions: true,
            show_dml_operations: true,
            show_soql_queries: true,
            shared_visited_scope: false,
        }
    }
}

impl AnalyzerConfig {
    /// Fatal configuration errors are surfaced before any extraction work.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            bail!("max_depth must be at least 1");
        }
        if self.max_nodes == Some(0) {
            bail!("max_nodes must be at least 1 when set");
        }
        Ok(())
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: AnalyzerConfig =
            toml::from_str(raw).context("Invalid analyzer configuration")?;
        config.validate()?;
        Ok(config)
    }
}
