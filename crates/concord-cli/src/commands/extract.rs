//! Extract command - full ensemble over one document.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::{debug, info, warn};

use concord_core::{BackendSelection, EnsembleCoordinator, EnsembleResult};

use super::output::{OutputFormat, format_ensemble};
use super::{load_config, load_document, spinner, write_output};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Input document (PDF or text)
    #[arg(required = true)]
    input: PathBuf,

    /// Backends to run: "all" or a comma-separated list of names
    #[arg(short, long, default_value = "all")]
    backends: String,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Show the confidence breakdown on stderr
    #[arg(long)]
    show_confidence: bool,
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let document = load_document(&args.input)?;
    let selection: BackendSelection = args.backends.parse()?;

    let coordinator = EnsembleCoordinator::from_config(&config);
    let request = coordinator.request(document, &selection)?;

    if request.backends().is_empty() {
        warn!("No usable backends in '{}'", args.backends);
    }
    info!(
        "Processing {} with {}",
        args.input.display(),
        request.backends().join(", ")
    );

    let pb = spinner(format!("Running {} backends...", request.backends().len()))?;
    let ensemble = coordinator.run(&request).await;
    pb.finish_and_clear();

    let output = format_ensemble(&ensemble, args.format)?;
    write_output(&output, args.output.as_deref())?;

    if args.show_confidence {
        print_confidence(&ensemble);
    }

    debug!("Total processing time: {:?}", start.elapsed());

    Ok(())
}

pub(crate) fn print_confidence(ensemble: &EnsembleResult) {
    let breakdown = &ensemble.confidence_breakdown;

    eprintln!();
    eprintln!(
        "{} Recommendation: {}",
        style("ℹ").blue(),
        ensemble.recommendation
    );
    eprintln!(
        "{} Overall confidence: {:.1}% (best: {} at {:.1}%)",
        style("ℹ").blue(),
        breakdown.overall * 100.0,
        breakdown.best_parser,
        breakdown.best_parser_confidence * 100.0
    );
    eprintln!(
        "{} {}/{} backends succeeded, agreement {:.1}%",
        style("ℹ").blue(),
        breakdown.parsers_succeeded,
        breakdown.parsers_attempted,
        breakdown.cross_model_agreement * 100.0
    );
    eprintln!(
        "{} Processing time: {}ms",
        style("ℹ").blue(),
        ensemble.extraction_metadata.total_extraction_time_ms
    );
}
