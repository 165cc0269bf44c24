//! Consensus line items across backends.

use std::collections::HashMap;

use crate::models::document::{LineItem, ParserResult};
use crate::models::ensemble::{ConsensusItem, ConsensusLevel};

/// Normalized identity of a line item: trimmed lowercase description and
/// quantity.
///
/// Matching is exact on this key. "Fire seal" and "Fire seals" are
/// different items.
pub fn item_key(item: &LineItem) -> String {
    format!("{}_{}", item.description.trim().to_lowercase(), item.quantity)
}

/// One reported item and the result it came from.
struct Report<'a> {
    item: &'a LineItem,
    source: &'a ParserResult,
}

/// Merge items from every usable result into consensus items, in order of
/// first appearance.
pub fn build_consensus(results: &[ParserResult]) -> Vec<ConsensusItem> {
    let usable: Vec<&ParserResult> = results.iter().filter(|r| r.is_usable()).collect();

    match usable.as_slice() {
        [] => Vec::new(),
        [only] => only
            .items
            .iter()
            .map(|item| single_source(item, only))
            .collect(),
        _ => group_reports(&usable)
            .into_iter()
            .map(|group| match group.as_slice() {
                [report] => single_source(report.item, report.source),
                _ => averaged(&group),
            })
            .collect(),
    }
}

fn group_reports<'a>(usable: &[&'a ParserResult]) -> Vec<Vec<Report<'a>>> {
    let mut groups: Vec<Vec<Report<'a>>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for source in usable {
        for item in &source.items {
            let report = Report { item, source };
            match index.get(&item_key(item)) {
                Some(&idx) => groups[idx].push(report),
                None => {
                    index.insert(item_key(item), groups.len());
                    groups.push(vec![report]);
                }
            }
        }
    }

    groups
}

fn single_source(item: &LineItem, source: &ParserResult) -> ConsensusItem {
    ConsensusItem {
        item: item.clone(),
        consensus_level: ConsensusLevel::SingleSource,
        agreement_count: 1,
        sources: vec![source.parser_name.clone()],
        source_parser: source.parser_name.clone(),
        source_confidence: source.confidence_score,
    }
}

fn averaged(group: &[Report<'_>]) -> ConsensusItem {
    // First report wins ties.
    let mut base = &group[0];
    for report in &group[1..] {
        if report.source.confidence_score > base.source.confidence_score {
            base = report;
        }
    }

    let mean = |field: fn(&LineItem) -> f64| {
        let values: Vec<f64> = group
            .iter()
            .map(|r| field(r.item))
            .filter(|v| *v > 0.0)
            .collect();

        if values.is_empty() {
            field(base.item)
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    };

    let item = LineItem {
        quantity: mean(|i| i.quantity),
        unit_price: mean(|i| i.unit_price),
        total_price: mean(|i| i.total_price),
        ..base.item.clone()
    };

    ConsensusItem {
        item,
        consensus_level: ConsensusLevel::MultiSourceAveraged,
        agreement_count: group.len(),
        sources: group.iter().map(|r| r.source.parser_name.clone()).collect(),
        source_parser: base.source.parser_name.clone(),
        source_confidence: base.source.confidence_score,
    }
}
