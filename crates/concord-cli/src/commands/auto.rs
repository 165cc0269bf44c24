//! Auto command - sequential backend selection with early exit.

use std::path::PathBuf;

use clap::Args;
use console::style;
use tracing::info;

use concord_core::{AutoOutcome, EnsembleCoordinator};

use super::extract::print_confidence;
use super::output::{OutputFormat, format_auto};
use super::{load_config, load_document, spinner, write_output};

/// Arguments for the auto command.
#[derive(Args)]
pub struct AutoArgs {
    /// Input document (PDF or text)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Override the acceptance threshold (0.0 - 1.0)
    #[arg(long)]
    threshold: Option<f64>,

    /// Show which backend was chosen on stderr
    #[arg(long)]
    show_confidence: bool,
}

pub async fn run(args: AutoArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(threshold) = args.threshold {
        config.auto.confidence_threshold = threshold;
        config.validate()?;
    }

    let document = load_document(&args.input)?;
    let coordinator = EnsembleCoordinator::from_config(&config);

    info!(
        "Auto-selecting over {} for {}",
        config.auto.order.join(", "),
        args.input.display()
    );

    let pb = spinner("Trying backends...".to_string())?;
    let outcome = coordinator.run_auto(&document).await;
    pb.finish_and_clear();

    let output = format_auto(&outcome, args.format)?;
    write_output(&output, args.output.as_deref())?;

    if args.show_confidence {
        match &outcome {
            AutoOutcome::Selected {
                selected_parser,
                result,
                tried_parsers,
            } => {
                eprintln!();
                eprintln!(
                    "{} Selected {} at {:.1}% after trying {}",
                    style("✓").green(),
                    selected_parser,
                    result.confidence_score * 100.0,
                    tried_parsers.join(", ")
                );
            }
            AutoOutcome::Ensemble(ensemble) => {
                eprintln!();
                eprintln!(
                    "{} No backend reached {:.0}%, used the ensemble",
                    style("!").yellow(),
                    config.auto.confidence_threshold * 100.0
                );
                print_confidence(ensemble);
            }
        }
    }

    Ok(())
}
