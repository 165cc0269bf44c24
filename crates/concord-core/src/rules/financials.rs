//! Document totals and identification fields.

use super::amounts::parse_amount;
use super::patterns::{CURRENCY_CODE, DOCUMENT_DATE, GRAND_TOTAL, QUOTE_NUMBER, SUBTOTAL, TAX};
use crate::models::document::Financials;

/// Extract subtotal, tax, grand total and currency from document text.
pub fn extract_financials(text: &str, default_currency: &str) -> Financials {
    let labelled = |pattern: &regex::Regex| {
        pattern
            .captures(text)
            .map(|caps| parse_amount(&caps[1]))
            .unwrap_or(0.0)
    };

    Financials {
        subtotal: labelled(&SUBTOTAL),
        tax: labelled(&TAX),
        grand_total: labelled(&GRAND_TOTAL),
        currency: detect_currency(text).unwrap_or(default_currency).to_string(),
    }
}

/// Detect an ISO currency code or an unambiguous currency symbol.
pub fn detect_currency(text: &str) -> Option<&'static str> {
    if let Some(caps) = CURRENCY_CODE.captures(text) {
        return match &caps[1] {
            "NZD" => Some("NZD"),
            "AUD" => Some("AUD"),
            "USD" => Some("USD"),
            "EUR" => Some("EUR"),
            "GBP" => Some("GBP"),
            "CAD" => Some("CAD"),
            _ => None,
        };
    }

    if text.contains('€') {
        Some("EUR")
    } else if text.contains('£') {
        Some("GBP")
    } else {
        None
    }
}

/// Quote number and date, when the document states them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentInfo {
    pub quote_number: Option<String>,
    pub quote_date: Option<String>,
}

/// Extract the quote number and date.
pub fn extract_document_info(text: &str) -> DocumentInfo {
    DocumentInfo {
        quote_number: QUOTE_NUMBER.captures(text).map(|c| c[1].to_string()),
        quote_date: DOCUMENT_DATE.captures(text).map(|c| c[1].to_string()),
    }
}
