//! Free-text line reader.

use async_trait::async_trait;
use tracing::debug;

use super::text::document_text;
use super::{Backend, run_blocking};
use crate::models::config::ExtractionConfig;
use crate::models::document::{Document, LineItem, ParserResult};
use crate::rules::patterns::ITEM_LINE;
use crate::rules::{
    extract_document_info, extract_financials, is_rate_schedule_page, parse_amount, score_confidence,
};

/// Lines shorter than this cannot hold five fields.
const MIN_LINE_LEN: usize = 10;

/// Matched lines needed before the text counts as structured.
const STRUCTURE_THRESHOLD: usize = 3;

pub struct LinesBackend {
    name: String,
    extraction: ExtractionConfig,
}

impl LinesBackend {
    pub fn new(name: impl Into<String>, extraction: ExtractionConfig) -> Self {
        Self {
            name: name.into(),
            extraction,
        }
    }
}

#[async_trait]
impl Backend for LinesBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(&self, document: &Document) -> ParserResult {
        let name = self.name.clone();
        let extraction = self.extraction.clone();
        let document = document.clone();

        run_blocking(&self.name, move || match document_text(&document) {
            Ok(pages) => parse_lines(&name, &pages, &extraction),
            Err(e) => ParserResult::failed(&name, e.to_string()),
        })
        .await
    }
}

/// Read `<description> <qty> <unit> <rate> <total>` lines from every page.
pub fn parse_lines(name: &str, pages: &[String], extraction: &ExtractionConfig) -> ParserResult {
    let kept: Vec<&str> = pages
        .iter()
        .map(String::as_str)
        .filter(|page| !(extraction.skip_rate_schedules && is_rate_schedule_page(page)))
        .collect();

    let mut items = Vec::new();
    for line in kept.iter().flat_map(|page| page.lines()) {
        let line = line.trim();
        if line.len() < MIN_LINE_LEN {
            continue;
        }

        if let Some(caps) = ITEM_LINE.captures(line) {
            items.push(LineItem {
                line_number: items.len() as u32 + 1,
                description: caps[1].trim().to_string(),
                quantity: parse_amount(&caps[2]),
                unit: caps[3].to_string(),
                unit_price: parse_amount(&caps[4]),
                total_price: parse_amount(&caps[5]),
            });
        }
    }

    let text = kept.join("\n");
    let financials = extract_financials(&text, &extraction.default_currency);
    let info = extract_document_info(&text);
    let confidence = score_confidence(&items, &financials, items.len() >= STRUCTURE_THRESHOLD);

    debug!("{}: {} item lines matched", name, items.len());

    let mut result = ParserResult::succeeded(name, items, financials, confidence)
        .with_metadata("num_pages", pages.len())
        .with_metadata("pages_skipped", pages.len() - kept.len());

    if let Some(number) = info.quote_number {
        result = result.with_metadata("quote_number", number);
    }
    if let Some(date) = info.quote_date {
        result = result.with_metadata("quote_date", date);
    }

    result
}
