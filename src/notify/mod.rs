//! Lifecycle, progress and error notifications
//!
//! Notification is one-way and best-effort: `notify` never blocks and never
//! fails from the caller's point of view. Delivery problems are logged at
//! debug level and dropped.

use crate::output::{CrawlResult, DetailedStats};
use crate::session::Phase;
use serde::Serialize;
use tokio::sync::broadcast;

/// Events emitted by the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CrawlEvent {
    PhaseStarted(PhaseStart),
    Progress(Progress),
    Completed(Box<CrawlResult>),
    Stopped(Box<CrawlResult>),
    Error {
        message: String,
    },
}

/// Payload of a phase-start event
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseStart {
    pub phase: Phase,
    #[serde(flatten)]
    pub detail: PhaseDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PhaseDetail {
    #[serde(rename_all = "camelCase")]
    Collecting {
        total_pages: u32,
        start_page: u32,
        end_page: u32,
    },
    #[serde(rename_all = "camelCase")]
    Scraping {
        total_urls: usize,
        urls_collected: usize,
        pages_processed: u32,
    },
}

/// Payload of a progress event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Progress {
    #[serde(rename_all = "camelCase")]
    Page {
        current_page: u32,
        total_pages: u32,
        urls_collected: usize,
        pages_scraped: u32,
        progress: f64,
    },
    #[serde(rename_all = "camelCase")]
    Product {
        current_product: usize,
        total_products: usize,
        products_scraped: usize,
        progress: f64,
        stats: DetailedStats,
        errors: usize,
    },
}

/// Receives orchestrator events
pub trait Notifier: Send + Sync {
    fn notify(&self, event: CrawlEvent);
}

/// Fans events out to every subscriber of a broadcast channel
#[derive(Debug, Clone)]
pub struct BroadcastNotifier {
    sender: broadcast::Sender<CrawlEvent>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CrawlEvent> {
        self.sender.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, event: CrawlEvent) {
        if let Err(e) = self.sender.send(event) {
            tracing::debug!("No subscriber for event: {:?}", e.0);
        }
    }
}

/// Writes events to the tracing log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: CrawlEvent) {
        match &event {
            CrawlEvent::PhaseStarted(start) => {
                tracing::info!("Phase {} started: {:?}", start.phase, start.detail)
            }
            CrawlEvent::Progress(Progress::Page {
                current_page,
                total_pages,
                urls_collected,
                progress,
                ..
            }) => tracing::info!(
                "Page {} ({} of range), {} URLs collected, {:.1}%",
                current_page,
                total_pages,
                urls_collected,
                progress
            ),
            CrawlEvent::Progress(Progress::Product {
                current_product,
                total_products,
                products_scraped,
                progress,
                ..
            }) => tracing::info!(
                "Product {}/{}, {} scraped, {:.1}%",
                current_product,
                total_products,
                products_scraped,
                progress
            ),
            CrawlEvent::Completed(result) => tracing::info!(
                "Crawl completed: {} products in {}",
                result.summary.products_scraped,
                result.summary.total_time
            ),
            CrawlEvent::Stopped(result) => tracing::info!(
                "Crawl stopped: {} products in {}",
                result.summary.products_scraped,
                result.summary.total_time
            ),
            CrawlEvent::Error { message } => tracing::warn!("Crawl error: {}", message),
        }
    }
}
