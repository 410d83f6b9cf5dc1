//! Markdown report generation
//!
//! Renders a stored result as a human-readable report: session metadata,
//! progress counters, field coverage, the errors table and a product table.

use crate::extractor::fields;
use crate::output::traits::{CrawlResult, OutputResult, ReportWriter};
use std::io::Write;

/// Products listed in the report table before truncating
const MAX_PRODUCT_ROWS: usize = 50;

/// Markdown report writer
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownReport;

impl ReportWriter for MarkdownReport {
    fn write_report(&self, result: &CrawlResult, out: &mut dyn Write) -> OutputResult<()> {
        out.write_all(format_markdown_report(result).as_bytes())?;
        Ok(())
    }
}

/// Formats a stored result as markdown
pub fn format_markdown_report(result: &CrawlResult) -> String {
    let summary = &result.summary;
    let mut md = String::new();

    md.push_str("# Shelf-Sweep Crawl Report\n\n");

    md.push_str("## Session\n\n");
    if let Some(config) = &result.config {
        md.push_str(&format!("- **Site**: {}\n", config.site));
        md.push_str(&format!("- **Query**: {}\n", config.query));
        md.push_str(&format!(
            "- **Pages**: {} to {}\n",
            config.start_page, config.end_page
        ));
    }
    md.push_str(&format!("- **Status**: {}\n", summary.status));
    if let Some(phase) = summary.stopped_phase {
        md.push_str(&format!("- **Stopped During**: {}\n", phase));
    }
    md.push_str(&format!("- **Started**: {}\n", summary.started_at.to_rfc3339()));
    md.push_str(&format!("- **Ended**: {}\n", summary.ended_at.to_rfc3339()));
    md.push_str(&format!("- **Total Time**: {}\n\n", summary.total_time));

    md.push_str("## Progress\n\n");
    md.push_str("| Metric | Value |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| Pages Processed | {} |\n", summary.pages_processed));
    md.push_str(&format!("| Unique URLs | {} |\n", summary.urls_collected));
    md.push_str(&format!("| Products Scraped | {} |\n", summary.products_scraped));
    md.push_str(&format!(
        "| Duplicates Skipped | {} |\n",
        summary.duplicates_skipped
    ));
    md.push_str(&format!("| Success Rate | {} |\n", summary.success_rate));
    md.push_str(&format!(
        "| Avg Parameters / Product | {:.1} |\n",
        summary.avg_params_per_product
    ));
    md.push_str(&format!("| Errors | {} |\n\n", summary.error_count));

    let stats = &summary.stats;
    md.push_str("## Field Coverage\n\n");
    md.push_str("| Field | Products |\n");
    md.push_str("|-------|----------|\n");
    md.push_str(&format!("| Rating Breakdown | {} |\n", stats.ratings_breakdown));
    md.push_str(&format!("| Multiple Colours | {} |\n", stats.colors_found));
    md.push_str(&format!("| Delivery Types | {} |\n", stats.delivery_types_found));
    md.push_str(&format!(
        "| Payment Methods | {} |\n",
        stats.payment_methods_found
    ));
    md.push_str(&format!(
        "| Highlights | {} |\n\n",
        stats.specifications_found
    ));

    if !result.products.is_empty() {
        md.push_str("## Products\n\n");
        md.push_str("| # | Title | Price | Rating |\n");
        md.push_str("|---|-------|-------|--------|\n");

        for product in result.products.iter().take(MAX_PRODUCT_ROWS) {
            let cell = |name: &str| {
                product
                    .fields
                    .get(name)
                    .map(|v| escape_cell(&v.to_display_string()))
                    .unwrap_or_default()
            };
            md.push_str(&format!(
                "| {} | [{}]({}) | {} | {} |\n",
                product.index,
                cell(fields::TITLE),
                product.url,
                cell(fields::PRICE),
                cell(fields::RATING)
            ));
        }
        if result.products.len() > MAX_PRODUCT_ROWS {
            md.push_str(&format!(
                "\n... and {} more\n",
                result.products.len() - MAX_PRODUCT_ROWS
            ));
        }
        md.push('\n');
    }

    if !result.errors.is_empty() {
        md.push_str("## Errors\n\n");
        md.push_str("| Phase | Context | Message |\n");
        md.push_str("|-------|---------|---------|\n");

        for error in &result.errors {
            let context = error
                .url
                .clone()
                .or_else(|| error.page.map(|p| format!("page {}", p)))
                .unwrap_or_default();
            md.push_str(&format!(
                "| {} | {} | {} |\n",
                error.phase,
                escape_cell(&context),
                escape_cell(&error.message)
            ));
        }
        md.push('\n');
    }

    md
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
