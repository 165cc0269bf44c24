//! Detection of rate schedule pages.
//!
//! Quotes often append a page of reference pricing tiers. Those rows look
//! like line items but are not quoted work, so readers skip the page.

use super::patterns::RATE_GROUP;

const INDICATORS: &[&str] = &[
    "rates\nschedule",
    "rate schedule",
    "rates schedule",
    "pricing schedule",
    "price schedule",
    "rate group",
    "tier 1",
    "tier 2",
    "tier 3",
];

/// Whether a page reads as a rate schedule rather than quoted items.
pub fn is_rate_schedule_page(page: &str) -> bool {
    if page.trim().is_empty() {
        return false;
    }

    let lower = page.to_lowercase();

    let hits = INDICATORS.iter().filter(|i| lower.contains(*i)).count();
    if hits >= 2 {
        return true;
    }

    if RATE_GROUP.is_match(&lower) {
        return true;
    }

    let heading = lower.lines().take(10).collect::<Vec<_>>().join("\n");
    heading.contains("rates\nschedule") || heading.contains("rate\nschedule")
}
