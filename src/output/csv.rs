//! CSV export of scraped products
//!
//! The header is the union of field names across all products (sorted),
//! followed by the enrichment columns. Lists are joined with `"; "` and
//! every cell is quoted.

use crate::output::traits::{CrawlResult, OutputError, OutputResult, ReportWriter};
use std::collections::BTreeSet;
use std::io::Write;

const TRAILING_COLUMNS: [&str; 3] = ["scrapedIndex", "productUrl", "extractionTimestamp"];

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvExport;

impl ReportWriter for CsvExport {
    fn write_report(&self, result: &CrawlResult, out: &mut dyn Write) -> OutputResult<()> {
        if result.products.is_empty() {
            return Err(OutputError::Empty("result holds no products".to_string()));
        }

        let field_names: BTreeSet<&str> = result
            .products
            .iter()
            .flat_map(|p| p.fields.keys().map(String::as_str))
            .collect();

        let header: Vec<String> = field_names
            .iter()
            .copied()
            .chain(TRAILING_COLUMNS)
            .map(quote)
            .collect();
        writeln!(out, "{}", header.join(","))?;

        for product in &result.products {
            let mut row: Vec<String> = field_names
                .iter()
                .map(|name| {
                    product
                        .fields
                        .get(*name)
                        .map(|v| quote(&v.to_display_string()))
                        .unwrap_or_else(|| quote(""))
                })
                .collect();
            row.push(quote(&product.index.to_string()));
            row.push(quote(&product.url));
            row.push(quote(&product.extracted_at.to_rfc3339()));
            writeln!(out, "{}", row.join(","))?;
        }

        Ok(())
    }
}

/// Wraps a cell in double quotes, doubling any quote inside it
fn quote(cell: &str) -> String {
    format!("\"{}\"", cell.replace('"', "\"\""))
}
