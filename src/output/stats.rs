//! Result aggregation
//!
//! Running per-product counters plus the summary computed when a session
//! completes or is stopped.

use crate::extractor::{fields, ProductFields};
use crate::output::traits::{CrawlResult, CrawlSummary, RunStatus};
use crate::session::Session;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Running counters fed by every accepted product
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedStats {
    /// Sum of field counts over all products
    pub total_parameters: u64,

    /// Products carrying a rating breakdown
    pub ratings_breakdown: u64,

    /// Products offered in more than one colour
    pub colors_found: u64,

    pub delivery_types_found: u64,
    pub payment_methods_found: u64,

    /// Products listing at least one highlight
    pub specifications_found: u64,
}

impl DetailedStats {
    pub fn record(&mut self, product: &ProductFields) {
        let items = |name: &str| product.get(name).map_or(0, |value| value.item_count());

        self.total_parameters += product.len() as u64;

        if items(fields::RATING_BREAKDOWN) > 0 {
            self.ratings_breakdown += 1;
        }
        if items(fields::AVAILABLE_COLORS) > 1 {
            self.colors_found += 1;
        }
        if items(fields::DELIVERY_TYPES) > 0 {
            self.delivery_types_found += 1;
        }
        if items(fields::PAYMENT_METHODS) >= 1 {
            self.payment_methods_found += 1;
        }
        if items(fields::PRODUCT_HIGHLIGHTS) >= 1 {
            self.specifications_found += 1;
        }
    }
}

/// Formats elapsed seconds as `Xh Ym Zs`, `Ym Zs` or `Zs`
pub fn format_duration(total_seconds: i64) -> String {
    let total_seconds = total_seconds.max(0);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

/// Scraped share of the queue with one decimal, or `"0%"` for an empty queue
pub fn success_rate(scraped: usize, queued: usize) -> String {
    if queued == 0 {
        return "0%".to_string();
    }
    format!("{:.1}%", scraped as f64 / queued as f64 * 100.0)
}

/// Mean field count per product rounded to one decimal
pub fn average_parameters(total_parameters: u64, products: usize) -> f64 {
    if products == 0 {
        return 0.0;
    }
    (total_parameters as f64 / products as f64 * 10.0).round() / 10.0
}

/// Computes the summary of a finished (or stopping) session
pub fn summarize(session: &Session, status: RunStatus, ended_at: DateTime<Utc>) -> CrawlSummary {
    let started_at = session.started_at();
    let scraped = session.products().len();
    let queued = session.queue_len();

    CrawlSummary {
        status,
        stopped_phase: match status {
            RunStatus::Stopped => Some(session.phase()),
            RunStatus::Completed => None,
        },
        total_time: format_duration((ended_at - started_at).num_seconds()),
        pages_processed: session.pages_processed(),
        urls_collected: session.collected_len(),
        products_scraped: scraped,
        duplicates_skipped: session.duplicates_skipped(),
        success_rate: success_rate(scraped, queued),
        avg_params_per_product: average_parameters(session.stats().total_parameters, scraped),
        error_count: session.errors().len(),
        started_at,
        ended_at,
        stats: session.stats().clone(),
    }
}

/// Prints a stored result to stdout
pub fn print_summary(result: &CrawlResult) {
    let summary = &result.summary;

    println!("=== Crawl Summary ===\n");

    println!("Session:");
    println!("  Status: {}", summary.status);
    if let Some(phase) = summary.stopped_phase {
        println!("  Stopped during: {}", phase);
    }
    if let Some(config) = &result.config {
        println!(
            "  Search: \"{}\" on {} (pages {}-{})",
            config.query, config.site, config.start_page, config.end_page
        );
    }
    println!("  Started: {}", summary.started_at.to_rfc3339());
    println!("  Ended: {}", summary.ended_at.to_rfc3339());
    println!("  Total time: {}", summary.total_time);
    println!();

    println!("Progress:");
    println!("  Pages processed: {}", summary.pages_processed);
    println!("  Unique URLs collected: {}", summary.urls_collected);
    println!("  Products scraped: {}", summary.products_scraped);
    println!("  Duplicates skipped: {}", summary.duplicates_skipped);
    println!("  Success rate: {}", summary.success_rate);
    println!(
        "  Average parameters per product: {:.1}",
        summary.avg_params_per_product
    );
    println!();

    let stats = &summary.stats;
    println!("Field Coverage:");
    println!("  Rating breakdown: {}", stats.ratings_breakdown);
    println!("  Multiple colours: {}", stats.colors_found);
    println!("  Delivery info: {}", stats.delivery_types_found);
    println!("  Payment info: {}", stats.payment_methods_found);
    println!("  Highlights: {}", stats.specifications_found);
    println!();

    println!("Errors: {}", summary.error_count);
    for error in result.errors.iter().take(10) {
        let context = error
            .url
            .clone()
            .or_else(|| error.page.map(|p| format!("page {}", p)))
            .unwrap_or_default();
        println!("  [{}] {} {}", error.phase, context, error.message);
    }
    if result.errors.len() > 10 {
        println!("  ... and {} more", result.errors.len() - 10);
    }
}
