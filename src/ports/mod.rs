use std::path::Path;

use crate::domain::analysis::AnalysisResult;

pub mod mermaid_exporter;

/// Output seam between the analysis core and rendering consumers.
pub trait ResultExporter {
    fn export(&self, result: &AnalysisResult, path: &Path) -> std::io::Result<()>;
    /// File extension this exporter produces, without the dot.
    fn extension(&self) -> &'static str;
}
