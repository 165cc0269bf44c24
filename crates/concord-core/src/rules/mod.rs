//! Rule-based extraction shared by the built-in text backends.

pub mod amounts;
pub mod financials;
pub mod patterns;
pub mod schedule;

pub use amounts::parse_amount;
pub use financials::{DocumentInfo, detect_currency, extract_document_info, extract_financials};
pub use schedule::is_rate_schedule_page;

use crate::models::document::{Financials, LineItem};

/// Score how much an extraction can be trusted.
///
/// Items found are worth 0.4 plus up to 0.1 for volume, a grand total 0.2,
/// recognisable structure 0.2, and the share of complete items up to 0.1.
pub fn score_confidence(items: &[LineItem], financials: &Financials, structure_found: bool) -> f64 {
    let mut score = 0.0;

    if !items.is_empty() {
        score += 0.4;
        score += (items.len() as f64 / 100.0).min(0.1);

        let complete = items.iter().filter(|i| i.is_complete()).count();
        score += complete as f64 / items.len() as f64 * 0.1;
    }

    if financials.grand_total > 0.0 {
        score += 0.2;
    }

    if structure_found {
        score += 0.2;
    }

    score.min(1.0)
}
