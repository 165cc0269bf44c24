//! Rendering ensemble and auto results.

use std::fmt::Write as _;

use concord_core::{
    AutoOutcome, ConsensusItem, ConsensusLevel, EnsembleResult, LineItem, ParserResult,
};

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV of line items
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub fn format_ensemble(ensemble: &EnsembleResult, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(ensemble)?),
        OutputFormat::Csv => consensus_csv(&ensemble.consensus_items),
        OutputFormat::Text => Ok(ensemble_text(ensemble)?),
    }
}

pub fn format_auto(outcome: &AutoOutcome, format: OutputFormat) -> anyhow::Result<String> {
    match (outcome, format) {
        (_, OutputFormat::Json) => Ok(serde_json::to_string_pretty(outcome)?),
        (AutoOutcome::Ensemble(ensemble), _) => format_ensemble(ensemble, format),
        (AutoOutcome::Selected { result, .. }, OutputFormat::Csv) => items_csv(&result.items),
        (
            AutoOutcome::Selected {
                selected_parser,
                result,
                tried_parsers,
            },
            OutputFormat::Text,
        ) => {
            let mut out = String::new();
            writeln!(out, "Selected: {} (confidence {:.2})", selected_parser, result.confidence_score)?;
            writeln!(out, "Tried: {}", tried_parsers.join(", "))?;
            out.push('\n');
            write_result_text(&mut out, result)?;
            Ok(out)
        }
    }
}

fn consensus_csv(items: &[ConsensusItem]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "line_number",
        "description",
        "quantity",
        "unit",
        "unit_price",
        "total_price",
        "consensus_level",
        "agreement_count",
        "sources",
        "source_parser",
        "source_confidence",
    ])?;

    for c in items {
        let level = match c.consensus_level {
            ConsensusLevel::SingleSource => "single_source",
            ConsensusLevel::MultiSourceAveraged => "multi_source_averaged",
        };

        wtr.write_record([
            &c.item.line_number.to_string(),
            &c.item.description,
            &c.item.quantity.to_string(),
            &c.item.unit,
            &format!("{:.2}", c.item.unit_price),
            &format!("{:.2}", c.item.total_price),
            level,
            &c.agreement_count.to_string(),
            &c.sources.join(";"),
            &c.source_parser,
            &format!("{:.2}", c.source_confidence),
        ])?;
    }

    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn items_csv(items: &[LineItem]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "line_number",
        "description",
        "quantity",
        "unit",
        "unit_price",
        "total_price",
    ])?;

    for item in items {
        wtr.write_record([
            &item.line_number.to_string(),
            &item.description,
            &item.quantity.to_string(),
            &item.unit,
            &format!("{:.2}", item.unit_price),
            &format!("{:.2}", item.total_price),
        ])?;
    }

    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn ensemble_text(ensemble: &EnsembleResult) -> Result<String, std::fmt::Error> {
    let breakdown = &ensemble.confidence_breakdown;
    let mut out = String::new();

    writeln!(out, "File: {}", ensemble.extraction_metadata.file_name)?;
    writeln!(out, "Recommendation: {}", ensemble.recommendation)?;
    writeln!(out, "Overall confidence: {:.1}%", breakdown.overall * 100.0)?;
    writeln!(
        out,
        "Backends: {}/{} succeeded, agreement {:.1}%",
        breakdown.parsers_succeeded,
        breakdown.parsers_attempted,
        breakdown.cross_model_agreement * 100.0
    )?;
    writeln!(
        out,
        "Best backend: {} ({:.2})",
        breakdown.best_parser, breakdown.best_parser_confidence
    )?;

    out.push_str("\nItems:\n");
    if ensemble.consensus_items.is_empty() {
        out.push_str("  (none)\n");
    }
    for (idx, c) in ensemble.consensus_items.iter().enumerate() {
        writeln!(
            out,
            "  {:>3}. {}  {} {} x {:.2} = {:.2}  [{}]",
            idx + 1,
            c.item.description,
            c.item.quantity,
            c.item.unit,
            c.item.unit_price,
            c.item.total_price,
            c.sources.join(", ")
        )?;
    }

    let financials = &ensemble.best_result.financials;
    if financials.grand_total > 0.0 {
        writeln!(out, "\nTotal: {:.2} {}", financials.grand_total, financials.currency)?;
    }

    let failures: Vec<&ParserResult> = ensemble.all_results.iter().filter(|r| !r.success).collect();
    if !failures.is_empty() {
        out.push_str("\nFailed backends:\n");
        for r in failures {
            writeln!(out, "  - {}: {}", r.parser_name, r.errors.join("; "))?;
        }
    }

    Ok(out)
}

fn write_result_text(out: &mut String, result: &ParserResult) -> std::fmt::Result {
    writeln!(out, "Items:")?;
    for item in &result.items {
        writeln!(
            out,
            "  {:>3}. {}  {} {} x {:.2} = {:.2}",
            item.line_number,
            item.description,
            item.quantity,
            item.unit,
            item.unit_price,
            item.total_price
        )?;
    }

    if result.financials.grand_total > 0.0 {
        writeln!(
            out,
            "\nTotal: {:.2} {}",
            result.financials.grand_total, result.financials.currency
        )?;
    }

    Ok(())
}
