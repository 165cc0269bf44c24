//! Best single result selection.

use crate::models::document::ParserResult;

const CONFIDENCE_WEIGHT: f64 = 0.7;
const COVERAGE_WEIGHT: f64 = 0.3;

/// Selection score: confidence blended with item count relative to the
/// largest result.
pub fn score(result: &ParserResult, max_items: usize) -> f64 {
    let coverage = if max_items == 0 {
        0.0
    } else {
        result.items.len() as f64 / max_items as f64
    };
    CONFIDENCE_WEIGHT * result.confidence_score + COVERAGE_WEIGHT * coverage
}

/// Pick the most trustworthy result.
///
/// Only successful results with items compete; the first one wins a tie.
/// With no contenders this falls back to the first result, then to
/// [`ParserResult::placeholder`].
pub fn select_best(results: &[ParserResult]) -> ParserResult {
    let usable: Vec<&ParserResult> = results.iter().filter(|r| r.is_usable()).collect();

    let Some(max_items) = usable.iter().map(|r| r.items.len()).max() else {
        return results.first().cloned().unwrap_or_else(ParserResult::placeholder);
    };

    let mut best = usable[0];
    let mut best_score = score(best, max_items);
    for &candidate in &usable[1..] {
        let candidate_score = score(candidate, max_items);
        if candidate_score > best_score {
            best = candidate;
            best_score = candidate_score;
        }
    }

    best.clone()
}
