// Infrastructure implementations for apextrace.

use std::io::Write;
use std::path::Path;

use crate::domain::analysis::AnalysisResult;
use crate::ports::ResultExporter;

pub mod concurrency;
pub mod source_loader;

pub use source_loader::SourceLoader;

/// Writes an `AnalysisResult` as pretty-printed JSON.
pub struct JsonExporter;

impl ResultExporter for JsonExporter {
    fn export(&self, result: &AnalysisResult, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(result)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}
