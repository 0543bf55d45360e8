// Command-line entry point for apextrace.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use apextrace::application::AnalyzeUsecase;
use apextrace::config::AnalyzerConfig;
use apextrace::domain::unit::SourceUnit;
use apextrace::infrastructure::{concurrency, JsonExporter, SourceLoader};
use apextrace::ports::mermaid_exporter::MermaidExporter;
use apextrace::ports::ResultExporter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Source root folder(s) containing .cls/.trigger units
    #[arg(short = 'd', long = "source", required = true)]
    source: Vec<PathBuf>,

    /// Objects to analyze (defaults to every object with a trigger)
    #[arg(long = "object")]
    object: Vec<String>,

    /// Output directory, one file per analyzed object
    #[arg(short, long, default_value = "analysis")]
    output: PathBuf,

    /// Output format (json, mermaid)
    #[arg(short, long, default_value = "json")]
    format: String,

    /// Maximum traversal depth (overrides the config file)
    #[arg(long)]
    max_depth: Option<usize>,

    /// Analyzer configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> Result<AnalyzerConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Cannot read config file {}", path.display()))?;
            AnalyzerConfig::from_toml_str(&raw)?
        }
        None => AnalyzerConfig::default(),
    };
    if let Some(depth) = cli.max_depth {
        config.max_depth = depth;
    }
    config.validate()?;
    Ok(config)
}

fn collect_units(cli: &Cli) -> Result<Vec<SourceUnit>> {
    let mut units = Vec::new();
    for root in &cli.source {
        units.extend(SourceLoader::load_tree(root)?);
    }
    // Multiple roots merge into one deterministic sequence.
    units.sort_by(|a, b| a.path.cmp(&b.path));
    units.dedup_by(|a, b| a.path == b.path);
    Ok(units)
}

fn run(cli: &Cli) -> Result<usize> {
    let config = load_config(cli)?;
    let units = collect_units(cli)?;
    if units.is_empty() {
        bail!("No .cls or .trigger units found under the given source root(s)");
    }

    let json_exporter = JsonExporter;
    let mermaid_exporter = MermaidExporter::new(&config);
    let exporter: &dyn ResultExporter = match cli.format.as_str() {
        "json" => &json_exporter,
        "mermaid" | "mmd" => &mermaid_exporter,
        other => bail!("Unknown output format: {other} (expected json or mermaid)"),
    };

    let usecase = AnalyzeUsecase {
        config: &config,
        exporter,
    };
    let results = usecase.run(&units, &cli.object, &cli.output)?;
    Ok(results.len())
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = concurrency::init_thread_pool() {
        eprintln!("[apextrace] WARN: thread pool init failed: {e}");
    }

    match run(&cli) {
        Ok(count) => println!(
            "Analysis completed! {} object(s) written to {} (format: {})",
            count,
            cli.output.display(),
            cli.format
        ),
        Err(e) => {
            eprintln!("Error: {e:?}");
            std::process::exit(1);
        }
    }
}
