//! Aggregate models produced by the ensemble.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::{LineItem, ParserResult};

/// How a consensus item was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsensusLevel {
    /// Reported by exactly one backend.
    SingleSource,
    /// Reported by several backends; numeric fields averaged.
    MultiSourceAveraged,
}

/// A line item reconciled across backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusItem {
    /// Reconciled item fields.
    #[serde(flatten)]
    pub item: LineItem,

    pub consensus_level: ConsensusLevel,

    /// Number of reports merged into this item.
    pub agreement_count: usize,

    /// Backends that reported this item.
    pub sources: Vec<String>,

    /// Backend whose report supplied the non-averaged fields.
    pub source_parser: String,

    /// Confidence of `source_parser`.
    pub source_confidence: f64,
}

/// Actionable tier for an ensemble result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Recommendation {
    HighConfidenceMultiParser,
    ModerateConfidenceSingleParser,
    LowConfidenceManualReview,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::HighConfidenceMultiParser => "HIGH_CONFIDENCE_MULTI_PARSER",
            Recommendation::ModerateConfidenceSingleParser => "MODERATE_CONFIDENCE_SINGLE_PARSER",
            Recommendation::LowConfidenceManualReview => "LOW_CONFIDENCE_MANUAL_REVIEW",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence figures behind a recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    /// `max(average confidence, best confidence * 0.9)`.
    pub overall: f64,
    pub parsers_succeeded: usize,
    pub parsers_attempted: usize,
    pub cross_model_agreement: f64,
    pub best_parser: String,
    pub best_parser_confidence: f64,
}

/// Bookkeeping about one ensemble run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleMetadata {
    pub total_extraction_time_ms: u64,

    /// Backends in the order their results arrived.
    pub parsers_used: Vec<String>,
    pub file_name: String,
    pub timestamp: DateTime<Utc>,
}

/// Final output of a full ensemble run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleResult {
    pub best_result: ParserResult,

    /// One entry per requested backend, in completion order.
    pub all_results: Vec<ParserResult>,
    pub consensus_items: Vec<ConsensusItem>,
    pub confidence_breakdown: ConfidenceBreakdown,
    pub recommendation: Recommendation,
    pub extraction_metadata: EnsembleMetadata,
}

/// Output of the auto-selection strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AutoOutcome {
    /// A backend reached the confidence threshold on its own.
    Selected {
        selected_parser: String,
        result: ParserResult,
        /// Backends invoked before and including the selected one.
        tried_parsers: Vec<String>,
    },
    /// No backend was confident enough; the ensemble ran instead.
    Ensemble(EnsembleResult),
}

impl AutoOutcome {
    /// Line items of the chosen answer, whichever path produced it.
    pub fn items(&self) -> Vec<LineItem> {
        match self {
            AutoOutcome::Selected { result, .. } => result.items.clone(),
            AutoOutcome::Ensemble(ensemble) => ensemble
                .consensus_items
                .iter()
                .map(|c| c.item.clone())
                .collect(),
        }
    }
}
