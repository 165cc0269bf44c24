//! Common regex patterns for quote and invoice text.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Labelled totals
    pub static ref SUBTOTAL: Regex = Regex::new(
        r"(?i)(?:subtotal|sub-total|sub total)[\s:$]*([0-9,]+\.?\d*)"
    ).unwrap();

    pub static ref TAX: Regex = Regex::new(
        r"(?i)\b(?:gst|tax|vat)(?:\s*\(?\d+(?:\.\d+)?\s*%\)?)?[\s:$]*([0-9,]+\.?\d*)"
    ).unwrap();

    // Word-bounded so "Subtotal" does not count as a total.
    pub static ref GRAND_TOTAL: Regex = Regex::new(
        r"(?i)\b(?:grand\s+total|total|amount\s+due)[\s:$]*([0-9,]+\.?\d*)"
    ).unwrap();

    // Currency
    pub static ref CURRENCY_CODE: Regex = Regex::new(
        r"\b(NZD|AUD|USD|EUR|GBP|CAD)\b"
    ).unwrap();

    // Document identification
    pub static ref QUOTE_NUMBER: Regex = Regex::new(
        r"(?i)quote\s*(?:no\.?|number|#)[\s:]*([A-Z0-9\-]+)"
    ).unwrap();

    pub static ref DOCUMENT_DATE: Regex = Regex::new(
        r"(?i)date[\s:]*(\d{1,2}[/-]\d{1,2}[/-]\d{2,4})"
    ).unwrap();

    // Rate schedule pages: "Group 2.5 ... $ 12.50 ea."
    pub static ref RATE_GROUP: Regex = Regex::new(
        r"(?i)group\s+\d+\.?\d*\s+.*?\$\s*\d+\.\d{2}\s+ea\."
    ).unwrap();

    // Table cell separator for space-aligned columns
    pub static ref CELL_GAP: Regex = Regex::new(r"\s{2,}").unwrap();

    // Free-text item line: description, qty, unit, rate, total
    // e.g. "Fire seal penetration 10 m2 50.00 500.00"
    pub static ref ITEM_LINE: Regex = Regex::new(
        r"(.+?)\s+(\d+(?:\.\d+)?)\s+([a-zA-Z²³]+\d?)\s+[$£€]?(\d+(?:,\d{3})*(?:\.\d{2})?)\s+[$£€]?(\d+(?:,\d{3})*(?:\.\d{2})?)"
    ).unwrap();
}
