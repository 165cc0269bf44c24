//! Table-layout reader.
//!
//! Finds runs of delimited rows (pipes, tabs or space-aligned columns),
//! maps the header row to line-item fields by keyword and reads each data
//! row as an item.

use async_trait::async_trait;
use tracing::debug;

use super::text::document_text;
use super::{Backend, run_blocking};
use crate::models::config::ExtractionConfig;
use crate::models::document::{Document, LineItem, ParserResult};
use crate::rules::patterns::CELL_GAP;
use crate::rules::{
    extract_document_info, extract_financials, is_rate_schedule_page, parse_amount, score_confidence,
};

/// Minimum cells for a line to count as a table row.
const MIN_CELLS: usize = 3;

const DESCRIPTION_KEYWORDS: &[&str] = &["description", "item", "desc"];
const QUANTITY_KEYWORDS: &[&str] = &["qty", "quantity", "quant"];
const UNIT_KEYWORDS: &[&str] = &["unit", "uom", "um"];
const RATE_KEYWORDS: &[&str] = &["rate", "unit price", "price"];
const TOTAL_KEYWORDS: &[&str] = &["total", "amount", "value"];

pub struct TableBackend {
    name: String,
    extraction: ExtractionConfig,
}

impl TableBackend {
    pub fn new(name: impl Into<String>, extraction: ExtractionConfig) -> Self {
        Self {
            name: name.into(),
            extraction,
        }
    }
}

#[async_trait]
impl Backend for TableBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn extract(&self, document: &Document) -> ParserResult {
        let name = self.name.clone();
        let extraction = self.extraction.clone();
        let document = document.clone();

        run_blocking(&self.name, move || match document_text(&document) {
            Ok(pages) => parse_pages(&name, &pages, &extraction),
            Err(e) => ParserResult::failed(&name, e.to_string()),
        })
        .await
    }
}

/// Read every table on the given pages.
pub fn parse_pages(name: &str, pages: &[String], extraction: &ExtractionConfig) -> ParserResult {
    let mut tables = Vec::new();
    let mut kept_text = Vec::new();
    let mut skipped = 0usize;

    for page in pages {
        if extraction.skip_rate_schedules && is_rate_schedule_page(page) {
            skipped += 1;
            continue;
        }
        tables.extend(find_tables(page));
        kept_text.push(page.as_str());
    }

    let items: Vec<LineItem> = tables.iter().flat_map(|t| read_table(t)).collect();

    let text = kept_text.join("\n");
    let financials = extract_financials(&text, &extraction.default_currency);
    let info = extract_document_info(&text);
    let confidence = score_confidence(&items, &financials, !tables.is_empty());

    debug!(
        "{}: {} tables, {} items, {} pages skipped",
        name,
        tables.len(),
        items.len(),
        skipped
    );

    let mut result = ParserResult::succeeded(name, items, financials, confidence)
        .with_metadata("num_pages", pages.len())
        .with_metadata("pages_skipped", skipped)
        .with_metadata("tables_found", tables.len());

    if let Some(number) = info.quote_number {
        result = result.with_metadata("quote_number", number);
    }
    if let Some(date) = info.quote_date {
        result = result.with_metadata("quote_date", date);
    }

    result
}

type Row = Vec<String>;

/// Group consecutive table rows; a table needs a header and one more row.
fn find_tables(page: &str) -> Vec<Vec<Row>> {
    let mut tables = Vec::new();
    let mut current: Vec<Row> = Vec::new();

    for line in page.lines() {
        if is_rule(line) {
            continue;
        }

        let cells = split_cells(line);
        if cells.len() >= MIN_CELLS {
            current.push(cells);
        } else if !current.is_empty() {
            let table = std::mem::take(&mut current);
            if table.len() >= 2 {
                tables.push(table);
            }
        }
    }

    if current.len() >= 2 {
        tables.push(current);
    }

    tables
}

fn split_cells(line: &str) -> Row {
    let line = line.trim();

    let cells: Vec<&str> = if line.contains('|') {
        line.trim_matches('|').split('|').collect()
    } else if line.contains('\t') {
        line.split('\t').collect()
    } else {
        CELL_GAP.split(line).collect()
    };

    cells.into_iter().map(|c| c.trim().to_string()).collect()
}

/// Horizontal rules such as `|---|---|` or `=====`.
fn is_rule(line: &str) -> bool {
    let line = line.trim();
    !line.is_empty()
        && line.contains(['-', '='])
        && line
            .chars()
            .all(|c| matches!(c, '-' | '=' | ':' | '+' | '|') || c.is_whitespace())
}

#[derive(Debug, Default, PartialEq)]
struct Columns {
    description: Option<usize>,
    quantity: Option<usize>,
    unit: Option<usize>,
    rate: Option<usize>,
    total: Option<usize>,
}

/// Map header cells to fields. Each column serves at most one field, so
/// "Unit Price" is claimed as the rate before the unit is looked up.
fn map_columns(header: &[String]) -> Columns {
    let lowered: Vec<String> = header.iter().map(|c| c.to_lowercase()).collect();
    let mut taken = vec![false; lowered.len()];

    let description = claim(&lowered, &mut taken, DESCRIPTION_KEYWORDS);
    let quantity = claim(&lowered, &mut taken, QUANTITY_KEYWORDS);
    let rate = claim(&lowered, &mut taken, RATE_KEYWORDS);
    let total = claim(&lowered, &mut taken, TOTAL_KEYWORDS);
    let unit = claim(&lowered, &mut taken, UNIT_KEYWORDS);

    Columns {
        description,
        quantity,
        unit,
        rate,
        total,
    }
}

fn claim(header: &[String], taken: &mut [bool], keywords: &[&str]) -> Option<usize> {
    let idx = header
        .iter()
        .enumerate()
        .find(|(i, cell)| !taken[*i] && keywords.iter().any(|k| cell.contains(k)))
        .map(|(i, _)| i)?;
    taken[idx] = true;
    Some(idx)
}

fn read_table(rows: &[Row]) -> Vec<LineItem> {
    let Some((header, data)) = rows.split_first() else {
        return Vec::new();
    };
    let columns = map_columns(header);

    let cell = |row: &Row, idx: Option<usize>| -> String {
        idx.and_then(|i| row.get(i)).cloned().unwrap_or_default()
    };

    data.iter()
        .enumerate()
        .filter_map(|(idx, row)| {
            let item = LineItem {
                line_number: idx as u32 + 1,
                description: cell(row, columns.description),
                quantity: parse_amount(&cell(row, columns.quantity)),
                unit: cell(row, columns.unit),
                unit_price: parse_amount(&cell(row, columns.rate)),
                total_price: parse_amount(&cell(row, columns.total)),
            };
            (!item.description.is_empty() && item.has_amount()).then_some(item)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const QUOTE: &str = "Quote No: Q-77
Description   Qty   Unit   Rate    Total
Fire seal     10    m2     50.00   500.00
Cable tray    2     ea     25.00   50.00

Total: $550.00
";

    fn pages(text: &str) -> Vec<String> {
        text.split('\x0c').map(str::to_string).collect()
    }

    #[test]
    fn test_space_aligned_table() {
        let result = parse_pages("table", &pages(QUOTE), &ExtractionConfig::default());

        assert!(result.success);
        assert_eq!(result.items.len(), 2);
        assert_eq!(
            result.items[0],
            LineItem {
                line_number: 1,
                description: "Fire seal".to_string(),
                quantity: 10.0,
                unit: "m2".to_string(),
                unit_price: 50.0,
                total_price: 500.0,
            }
        );
        assert_eq!(result.items[1].line_number, 2);
        assert_eq!(result.financials.grand_total, 550.0);
        assert_eq!(result.metadata["tables_found"], 1);
        assert_eq!(result.metadata["quote_number"], "Q-77");
        assert!((result.confidence_score - 0.92).abs() < 1e-9);
    }

    #[test]
    fn test_pipe_table_with_rule() {
        let text = "| Item | Quantity | Unit Price | Amount |\n\
                    |------|----------|------------|--------|\n\
                    | Widget | 10 | $5.00 | $50.00 |\n";
        let result = parse_pages("table", &pages(text), &ExtractionConfig::default());

        assert_eq!(result.items.len(), 1);
        assert_eq!(result.items[0].description, "Widget");
        assert_eq!(result.items[0].unit_price, 5.0);
        assert_eq!(result.items[0].total_price, 50.0);
        assert_eq!(result.items[0].unit, "");
    }

    #[test]
    fn test_unit_price_column_is_not_unit() {
        let header: Row = ["Description", "Qty", "Unit", "Unit Price", "Total"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        assert_eq!(
            map_columns(&header),
            Columns {
                description: Some(0),
                quantity: Some(1),
                unit: Some(2),
                rate: Some(3),
                total: Some(4),
            }
        );
    }

    #[test]
    fn test_rate_schedule_page_skipped() {
        let text = format!(
            "{QUOTE}\x0cRate Schedule\nTier 1 pricing\nDescription  Qty  Rate  Total\nGroup A  1  9.00  9.00\n"
        );
        let result = parse_pages("table", &pages(&text), &ExtractionConfig::default());

        assert_eq!(result.items.len(), 2);
        assert_eq!(result.metadata["pages_skipped"], 1);
        assert_eq!(result.metadata["num_pages"], 2);
    }

    #[test]
    fn test_no_tables() {
        let result = parse_pages("table", &pages("just a note"), &ExtractionConfig::default());

        assert!(result.success);
        assert!(result.items.is_empty());
        assert_eq!(result.confidence_score, 0.0);
    }

    #[tokio::test]
    async fn test_extract_reports_unreadable_document() {
        let backend = TableBackend::new("table", ExtractionConfig::default());
        let result = backend.extract(&Document::new(vec![0xff, 0xfe], "x.bin")).await;

        assert!(!result.success);
        assert_eq!(result.parser_name, "table");
        assert!(!result.errors.is_empty());
    }
}
