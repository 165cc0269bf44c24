//! Amount parsing for heterogeneous numeric text.

/// Parse an amount such as `"$1,234.50"`, `"NZD 99"` or `" 12 "`.
///
/// Currency symbols, thousands separators, whitespace and leading/trailing
/// currency codes are removed. Anything unparsable, negative or non-finite
/// yields `0.0`.
pub fn parse_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | '£' | '€' | '¥') && !c.is_whitespace())
        .collect();

    let cleaned = cleaned
        .trim_start_matches(|c: char| c.is_ascii_alphabetic())
        .trim_end_matches(|c: char| c.is_ascii_alphabetic());

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => 0.0,
    }
}
