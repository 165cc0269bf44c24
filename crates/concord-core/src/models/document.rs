//! Documents, line items and the per-backend result contract.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Currency assumed when a document does not name one.
pub const DEFAULT_CURRENCY: &str = "NZD";

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// A document submitted for extraction.
///
/// Cloning is cheap: the bytes are shared between every backend task.
#[derive(Debug, Clone)]
pub struct Document {
    bytes: Arc<[u8]>,
    filename: String,
}

impl Document {
    /// Wrap raw bytes and the file name they came from.
    pub fn new(bytes: impl Into<Arc<[u8]>>, filename: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            filename: filename.into(),
        }
    }

    /// Raw document bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Original file name.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// A single extracted line item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineItem {
    /// Position of the row within its source table (1-based).
    pub line_number: u32,

    /// Product/service description.
    pub description: String,

    /// Quantity.
    pub quantity: f64,

    /// Unit of measure.
    pub unit: String,

    /// Price per unit.
    pub unit_price: f64,

    /// Total for this line.
    pub total_price: f64,
}

impl LineItem {
    /// True when description, quantity, unit price and total are all present.
    pub fn is_complete(&self) -> bool {
        !self.description.is_empty()
            && self.quantity != 0.0
            && self.unit_price != 0.0
            && self.total_price != 0.0
    }

    /// True when at least one numeric field carries a value.
    pub fn has_amount(&self) -> bool {
        self.quantity != 0.0 || self.unit_price != 0.0 || self.total_price != 0.0
    }

    /// Force every numeric field to a finite, non-negative value.
    pub fn clamp_amounts(&mut self) {
        self.quantity = clamp_amount(self.quantity);
        self.unit_price = clamp_amount(self.unit_price);
        self.total_price = clamp_amount(self.total_price);
    }
}

/// Document-level totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Financials {
    pub subtotal: f64,
    pub tax: f64,
    pub grand_total: f64,

    /// ISO currency code.
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Financials {
    pub fn clamp_amounts(&mut self) {
        self.subtotal = clamp_amount(self.subtotal);
        self.tax = clamp_amount(self.tax);
        self.grand_total = clamp_amount(self.grand_total);
    }
}

impl Default for Financials {
    fn default() -> Self {
        Self {
            subtotal: 0.0,
            tax: 0.0,
            grand_total: 0.0,
            currency: default_currency(),
        }
    }
}

/// The uniform result every backend produces.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserResult {
    /// Registered name of the backend that produced this result.
    pub parser_name: String,

    /// Whether extraction completed.
    pub success: bool,

    /// Extracted line items.
    pub items: Vec<LineItem>,

    /// Backend-specific metadata (page counts, document numbers, ...).
    pub metadata: BTreeMap<String, Value>,

    /// Document totals.
    pub financials: Financials,

    /// Self-reported confidence (0.0 - 1.0).
    pub confidence_score: f64,

    /// Wall-clock time spent in the backend.
    pub extraction_time_ms: u64,

    /// Errors encountered; never empty on failure.
    pub errors: Vec<String>,
}

impl ParserResult {
    /// A successful result.
    pub fn succeeded(
        parser_name: impl Into<String>,
        items: Vec<LineItem>,
        financials: Financials,
        confidence_score: f64,
    ) -> Self {
        Self {
            parser_name: parser_name.into(),
            success: true,
            items,
            financials,
            confidence_score: clamp_confidence(confidence_score),
            ..Self::default()
        }
    }

    /// A failed result carrying one error.
    pub fn failed(parser_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            parser_name: parser_name.into(),
            errors: vec![error.into()],
            ..Self::default()
        }
    }

    /// The "nothing ran" sentinel used when there is no result at all.
    pub fn placeholder() -> Self {
        Self {
            parser_name: "none".to_string(),
            ..Self::default()
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.extraction_time_ms = elapsed.as_millis() as u64;
        self
    }

    /// Succeeded and produced at least one item.
    pub fn is_usable(&self) -> bool {
        self.success && !self.items.is_empty()
    }
}

/// Map any reported confidence into `[0, 1]`; non-finite values become 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Negative and non-finite amounts become 0.
pub fn clamp_amount(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_result_deserializes_with_missing_fields() {
        let result: ParserResult = serde_json::from_str(
            r#"{"success": true, "items": [{"description": "Fire seal", "quantity": 10}]}"#,
        )
        .unwrap();

        assert!(result.is_usable());
        assert_eq!(result.items[0].unit_price, 0.0);
        assert_eq!(result.financials.currency, "NZD");
        assert!(result.errors.is_empty());
    }

    #[test]
    fn test_failed_result_has_error() {
        let result = ParserResult::failed("table", "boom");
        assert!(!result.success);
        assert_eq!(result.errors, vec!["boom".to_string()]);
        assert_eq!(result.confidence_score, 0.0);
    }

    #[test]
    fn test_clamp_confidence() {
        assert_eq!(clamp_confidence(1.7), 1.0);
        assert_eq!(clamp_confidence(-0.2), 0.0);
        assert_eq!(clamp_confidence(f64::NAN), 0.0);
    }

    #[test]
    fn test_clamp_amounts() {
        let mut item = LineItem {
            description: "Refund".to_string(),
            quantity: -3.0,
            unit_price: f64::INFINITY,
            total_price: 12.5,
            ..Default::default()
        };
        item.clamp_amounts();

        assert_eq!(item.quantity, 0.0);
        assert_eq!(item.unit_price, 0.0);
        assert_eq!(item.total_price, 12.5);
        assert_eq!(clamp_amount(f64::NAN), 0.0);
    }

    #[test]
    fn test_line_item_completeness() {
        let mut item = LineItem {
            description: "Cable tray".to_string(),
            quantity: 2.0,
            unit_price: 5.0,
            total_price: 10.0,
            ..LineItem::default()
        };
        assert!(item.is_complete());

        item.unit_price = 0.0;
        assert!(!item.is_complete());
        assert!(item.has_amount());
    }
}
