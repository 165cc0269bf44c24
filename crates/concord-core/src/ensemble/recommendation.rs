//! Recommendation tiers.

use crate::models::document::ParserResult;
use crate::models::ensemble::Recommendation;

const HIGH_CONFIDENCE: f64 = 0.7;
const MODERATE_CONFIDENCE: f64 = 0.6;

/// Map success count and average confidence to a recommendation.
pub fn classify(success_count: usize, average_confidence: f64) -> Recommendation {
    match success_count {
        n if n >= 2 && average_confidence >= HIGH_CONFIDENCE => {
            Recommendation::HighConfidenceMultiParser
        }
        1 if average_confidence >= MODERATE_CONFIDENCE => {
            Recommendation::ModerateConfidenceSingleParser
        }
        _ => Recommendation::LowConfidenceManualReview,
    }
}

/// Mean confidence over every result, failures included; 0 when empty.
pub fn average_confidence(results: &[ParserResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    results.iter().map(|r| r.confidence_score).sum::<f64>() / results.len() as f64
}
