//! Batch command - run the ensemble over many documents.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, error, warn};

use concord_core::{BackendSelection, EnsembleCoordinator, EnsembleResult};

use super::output::{OutputFormat, format_ensemble};
use super::{load_config, load_document};

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching input documents
    #[arg(required = true)]
    input: String,

    /// Output directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Output format for each file
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Backends to run: "all" or a comma-separated list of names
    #[arg(short, long, default_value = "all")]
    backends: String,

    /// Also generate a summary CSV
    #[arg(long)]
    summary: bool,

    /// Continue on error
    #[arg(long)]
    continue_on_error: bool,
}

/// Outcome for one file.
struct FileOutcome {
    path: PathBuf,
    ensemble: Option<EnsembleResult>,
    error: Option<String>,
    processing_time_ms: u64,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = load_config(config_path)?;
    let selection: BackendSelection = args.backends.parse()?;
    let coordinator = EnsembleCoordinator::from_config(&config);

    let files: Vec<PathBuf> = glob(&args.input)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();

    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    if let Some(ref output_dir) = args.output_dir {
        fs::create_dir_all(output_dir)?;
    }

    let pb = ProgressBar::new(files.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    // Files run one after another; each file's backends run in parallel.
    let mut outcomes = Vec::with_capacity(files.len());

    for path in files {
        let file_start = Instant::now();
        let result = process_file(&coordinator, &path, &selection).await;
        let processing_time_ms = file_start.elapsed().as_millis() as u64;

        match result {
            Ok(ensemble) => {
                if let Some(output_dir) = &args.output_dir {
                    write_file_output(output_dir, &path, &ensemble, args.format)?;
                }
                outcomes.push(FileOutcome {
                    path,
                    ensemble: Some(ensemble),
                    error: None,
                    processing_time_ms,
                });
            }
            Err(e) => {
                let error_msg = e.to_string();
                if args.continue_on_error {
                    warn!("Failed to process {}: {}", path.display(), error_msg);
                    outcomes.push(FileOutcome {
                        path,
                        ensemble: None,
                        error: Some(error_msg),
                        processing_time_ms,
                    });
                } else {
                    error!("Failed to process {}: {}", path.display(), error_msg);
                    anyhow::bail!("Processing failed: {}", error_msg);
                }
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Complete");

    if args.summary {
        let summary_path = args
            .output_dir
            .as_ref()
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &outcomes)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = outcomes.iter().filter(|o| o.error.is_some()).collect();
    let needs_review = outcomes
        .iter()
        .filter_map(|o| o.ensemble.as_ref())
        .filter(|e| e.recommendation == concord_core::Recommendation::LowConfidenceManualReview)
        .count();

    eprintln!();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        outcomes.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} successful, {} failed, {} need manual review",
        style(outcomes.len() - failed.len()).green(),
        style(failed.len()).red(),
        style(needs_review).yellow()
    );

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{}", style("Failed files:").red());
        for outcome in &failed {
            eprintln!(
                "  - {}: {}",
                outcome.path.display(),
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

async fn process_file(
    coordinator: &EnsembleCoordinator,
    path: &Path,
    selection: &BackendSelection,
) -> anyhow::Result<EnsembleResult> {
    let document = load_document(path)?;
    let request = coordinator.request(document, selection)?;
    Ok(coordinator.run(&request).await)
}

fn write_file_output(
    output_dir: &Path,
    path: &Path,
    ensemble: &EnsembleResult,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    let output_path = output_dir.join(format!("{}.{}", stem, format.extension()));

    fs::write(&output_path, format_ensemble(ensemble, format)?)?;
    debug!("Wrote output to {}", output_path.display());
    Ok(())
}

fn write_summary(path: &Path, outcomes: &[FileOutcome]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "recommendation",
        "best_backend",
        "backends_succeeded",
        "backends_attempted",
        "consensus_items",
        "grand_total",
        "currency",
        "overall_confidence",
        "agreement",
        "processing_time_ms",
        "error",
    ])?;

    for outcome in outcomes {
        let filename = outcome
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        if let Some(ensemble) = &outcome.ensemble {
            let breakdown = &ensemble.confidence_breakdown;
            let financials = &ensemble.best_result.financials;
            wtr.write_record([
                filename,
                "success",
                ensemble.recommendation.as_str(),
                &breakdown.best_parser,
                &breakdown.parsers_succeeded.to_string(),
                &breakdown.parsers_attempted.to_string(),
                &ensemble.consensus_items.len().to_string(),
                &format!("{:.2}", financials.grand_total),
                &financials.currency,
                &format!("{:.2}", breakdown.overall),
                &format!("{:.2}", breakdown.cross_model_agreement),
                &outcome.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                "",
                &outcome.processing_time_ms.to_string(),
                outcome.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}
