// Application usecases for apextrace.

use std::path::Path;

use anyhow::{Context, Result};

use crate::config::AnalyzerConfig;
use crate::domain::analysis::{analyze_object, AnalysisResult};
use crate::domain::repository::SourceRepository;
use crate::domain::unit::SourceUnit;
use crate::ports::ResultExporter;

pub struct AnalyzeUsecase<'a> {
    pub config: &'a AnalyzerConfig,
    pub exporter: &'a dyn ResultExporter,
}

impl<'a> AnalyzeUsecase<'a> {
    /// Analyze the requested objects (or every object with a trigger when
    /// none are named) and export one result file per object to `out_dir`.
    pub fn run(
        &self,
        units: &[SourceUnit],
        objects: &[String],
        out_dir: &Path,
    ) -> Result<Vec<AnalysisResult>> {
        self.config.validate()?;

        let repo = SourceRepository::build(units);
        println!(
            "[apextrace] Indexed {} classes, {} triggers",
            repo.class_count(),
            repo.trigger_count()
        );

        let targets: Vec<String> = if objects.is_empty() {
            repo.objects_with_triggers()
        } else {
            objects.to_vec()
        };

        std::fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

        let mut results = Vec::new();
        for object in &targets {
            let result = analyze_object(&repo, self.config, object);
            let file = out_dir.join(format!("{}.{}", object, self.exporter.extension()));
            self.exporter
                .export(&result, &file)
                .with_context(|| format!("Failed to write {}", file.display()))?;
            println!(
                "[apextrace] {}: {} entry point(s), {} finding(s)",
                object,
                result.entry_points.len(),
                result.recursion_risks.len()
            );
            results.push(result);
        }
        Ok(results)
    }
}
