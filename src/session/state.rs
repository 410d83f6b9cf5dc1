use crate::config::CrawlConfig;
use crate::extractor::ProductFields;
use crate::output::stats::DetailedStats;
use crate::session::{ErrorRecord, Phase, ProductRecord, TimerSet};
use crate::CrawlError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;

/// The single mutable state machine instance of a crawl
///
/// A session is created fresh on every start and mutated only by the
/// orchestrator. Once it reaches a terminal phase it is read-only.
#[derive(Debug)]
pub struct Session {
    generation: u64,
    active: bool,
    phase: Phase,
    config: Option<CrawlConfig>,

    current_page: u32,
    pages_processed: u32,
    collected: Vec<String>,
    collected_keys: HashSet<String>,

    queue: Vec<String>,
    cursor: usize,
    scraped_keys: HashSet<String>,

    products: Vec<ProductRecord>,
    errors: Vec<ErrorRecord>,
    stats: DetailedStats,

    started_at: DateTime<Utc>,
    last_page: Option<u32>,
    last_url: Option<String>,

    timers: TimerSet,
}

impl Session {
    /// The placeholder held before the first start
    pub fn idle() -> Self {
        Self {
            generation: 0,
            active: false,
            phase: Phase::Idle,
            config: None,
            current_page: 0,
            pages_processed: 0,
            collected: Vec::new(),
            collected_keys: HashSet::new(),
            queue: Vec::new(),
            cursor: 0,
            scraped_keys: HashSet::new(),
            products: Vec::new(),
            errors: Vec::new(),
            stats: DetailedStats::default(),
            started_at: Utc::now(),
            last_page: None,
            last_url: None,
            timers: TimerSet::new(),
        }
    }

    /// Creates an active session positioned on the first page of `config`
    pub fn new(generation: u64, config: CrawlConfig, timers: TimerSet) -> Self {
        Self {
            generation,
            active: true,
            current_page: config.start_page,
            config: Some(config),
            timers,
            ..Self::idle()
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Returns true if work scheduled by `generation` may still touch this session
    pub fn accepts(&self, generation: u64) -> bool {
        self.active && self.generation == generation
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn config(&self) -> Option<&CrawlConfig> {
        self.config.as_ref()
    }

    /// Moves the session to `to`, refusing anything but a forward move
    pub fn transition(&mut self, to: Phase) -> Result<(), CrawlError> {
        if !self.phase.can_transition_to(to) {
            return Err(CrawlError::InvalidTransition {
                from: self.phase,
                to,
            });
        }

        tracing::debug!(
            "Session {} phase {} -> {}",
            self.generation,
            self.phase,
            to
        );
        self.phase = to;
        Ok(())
    }

    /// Ends the session in a terminal phase; it accepts no further work
    pub fn finish(&mut self, phase: Phase) -> Result<(), CrawlError> {
        self.transition(phase)?;
        self.active = false;
        Ok(())
    }

    pub fn release_timers(&mut self) {
        self.timers.release();
    }

    pub fn timers_mut(&mut self) -> &mut TimerSet {
        &mut self.timers
    }

    // ===== URL collection =====

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn advance_page(&mut self) {
        self.current_page += 1;
    }

    pub fn pages_processed(&self) -> u32 {
        self.pages_processed
    }

    pub fn mark_page_processed(&mut self) {
        self.pages_processed += 1;
    }

    /// Inserts a normalized key unless it is already known or `cap` is reached
    ///
    /// Returns true if the key was added.
    pub fn insert_collected(&mut self, key: String, cap: usize) -> bool {
        if self.collected.len() >= cap || self.collected_keys.contains(&key) {
            return false;
        }
        self.collected_keys.insert(key.clone());
        self.collected.push(key);
        true
    }

    pub fn collected_len(&self) -> usize {
        self.collected.len()
    }

    // ===== Product details =====

    /// Builds the product queue from the collected keys in discovery order
    /// and enters the detail phase
    pub fn begin_details(&mut self) -> Result<(), CrawlError> {
        self.transition(Phase::ScrapingDetails)?;
        self.queue = self.collected.clone();
        self.cursor = 0;
        self.scraped_keys.clear();
        Ok(())
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// URL under the cursor, or None once the queue is exhausted
    pub fn current_url(&self) -> Option<&str> {
        self.queue.get(self.cursor).map(String::as_str)
    }

    pub fn advance_cursor(&mut self) {
        self.cursor += 1;
    }

    pub fn is_scraped(&self, key: &str) -> bool {
        self.scraped_keys.contains(key)
    }

    /// Appends an extracted product and feeds the statistics
    ///
    /// `key` must be the normalized form of the URL under the cursor.
    pub fn accept_product(&mut self, key: String, fields: ProductFields) -> &ProductRecord {
        self.stats.record(&fields);
        self.scraped_keys.insert(key.clone());
        self.products.push(ProductRecord {
            fields,
            index: self.cursor + 1,
            total_in_batch: self.queue.len(),
            session_id: self.session_id(),
            url: key,
            extracted_at: Utc::now(),
        });
        &self.products[self.products.len() - 1]
    }

    // ===== Accumulated results =====

    pub fn record_error(&mut self, error: ErrorRecord) {
        self.errors.push(error);
    }

    pub fn products(&self) -> &[ProductRecord] {
        &self.products
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn stats(&self) -> &DetailedStats {
        &self.stats
    }

    /// Queued units that did not become a product
    pub fn duplicates_skipped(&self) -> usize {
        self.queue.len().saturating_sub(self.products.len())
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Epoch milliseconds of the session start, used as its id
    pub fn session_id(&self) -> i64 {
        self.started_at.timestamp_millis()
    }

    pub fn last_page(&self) -> Option<u32> {
        self.last_page
    }

    pub fn last_url(&self) -> Option<&str> {
        self.last_url.as_deref()
    }

    pub fn set_last_page(&mut self, page: u32) {
        self.last_page = Some(page);
    }

    pub fn set_last_url(&mut self, url: &str) {
        self.last_url = Some(url.to_string());
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            generation: self.generation,
            active: self.active,
            phase: self.phase,
            current_page: self.current_page,
            total_pages: self.config.as_ref().map_or(0, CrawlConfig::total_pages),
            pages_processed: self.pages_processed,
            urls_collected: self.collected.len(),
            cursor: self.cursor,
            total_urls: self.queue.len(),
            products_scraped: self.products.len(),
            duplicates_skipped: self.duplicates_skipped(),
            error_count: self.errors.len(),
            config: self.config.clone(),
            stats: self.stats.clone(),
        }
    }
}

/// Read-only view of a session returned by `status()`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub generation: u64,
    pub active: bool,
    pub phase: Phase,
    pub current_page: u32,
    pub total_pages: u32,
    pub pages_processed: u32,
    pub urls_collected: usize,
    pub cursor: usize,
    pub total_urls: usize,
    pub products_scraped: usize,
    pub duplicates_skipped: usize,
    pub error_count: usize,
    pub config: Option<CrawlConfig>,
    pub stats: DetailedStats,
}
