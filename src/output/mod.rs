//! Output module for crawl results
//!
//! This module handles:
//! - Aggregating per-product statistics and computing session summaries
//! - Rendering stored results as markdown reports
//! - Exporting scraped products as CSV

mod csv;
mod markdown;
pub mod stats;
mod traits;

pub use csv::CsvExport;
pub use markdown::{format_markdown_report, MarkdownReport};
pub use stats::{print_summary, summarize, DetailedStats};
pub use traits::{CrawlResult, CrawlSummary, OutputError, OutputResult, ReportWriter, RunStatus};

use crate::session::Session;
use chrono::Utc;

/// Builds the persisted result object for `session`, ending now
pub fn build_result(session: &Session, status: RunStatus) -> CrawlResult {
    CrawlResult {
        summary: summarize(session, status, Utc::now()),
        products: session.products().to_vec(),
        errors: session.errors().to_vec(),
        config: session.config().cloned(),
    }
}
