//! Cross-backend agreement.

use std::collections::{HashMap, HashSet};

use super::consensus::item_key;
use crate::models::document::ParserResult;

/// Share of distinct items reported by at least two backends.
///
/// Returns `1.0` when fewer than two results are usable, since there is
/// nothing to disagree with.
pub fn cross_model_agreement(results: &[ParserResult]) -> f64 {
    let usable: Vec<&ParserResult> = results.iter().filter(|r| r.is_usable()).collect();
    if usable.len() < 2 {
        return 1.0;
    }

    // key -> number of results reporting it
    let mut reporters: HashMap<String, usize> = HashMap::new();
    for result in &usable {
        let keys: HashSet<String> = result.items.iter().map(item_key).collect();
        for key in keys {
            *reporters.entry(key).or_default() += 1;
        }
    }

    if reporters.is_empty() {
        return 0.0;
    }

    let shared = reporters.values().filter(|&&n| n >= 2).count();
    shared as f64 / reporters.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::testing::{item, result};

    #[test]
    fn test_vacuous_agreement() {
        assert_eq!(cross_model_agreement(&[]), 1.0);
        assert_eq!(
            cross_model_agreement(&[
                result("table", 0.9, vec![item("Widget", 1.0, 1.0)]),
                ParserResult::failed("ocr", "boom"),
            ]),
            1.0
        );
    }

    #[test]
    fn test_partial_agreement() {
        let results = vec![
            result("table", 0.9, vec![item("Widget", 1.0, 1.0), item("Bolt", 2.0, 1.0)]),
            result("lines", 0.7, vec![item("widget ", 1.0, 1.5), item("Nut", 3.0, 1.0)]),
        ];

        // widget_1 shared; bolt_2 and nut_3 not
        assert!((cross_model_agreement(&results) - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_repeats_within_one_result_do_not_agree() {
        let results = vec![
            result("table", 0.9, vec![item("Widget", 1.0, 1.0), item("Widget", 1.0, 1.0)]),
            result("lines", 0.7, vec![item("Bolt", 1.0, 1.0)]),
        ];

        assert_eq!(cross_model_agreement(&results), 0.0);
    }

    #[test]
    fn test_full_agreement() {
        let results = vec![
            result("table", 0.9, vec![item("Widget", 1.0, 1.0)]),
            result("lines", 0.7, vec![item("WIDGET", 1.0, 2.0)]),
            result("ocr", 0.4, vec![item("widget", 1.0, 3.0)]),
        ];

        assert_eq!(cross_model_agreement(&results), 1.0);
    }
}
