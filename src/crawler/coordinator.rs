//! Crawl orchestrator - the two-phase session state machine
//!
//! This module contains the control loop that drives one session:
//! - Walking the configured page range and collecting product URLs
//! - Visiting each collected URL and extracting a product record
//! - Recording failures and advancing past them
//! - Persisting and announcing the result on completion or stop
//!
//! The session lives behind a single mutex that is never held across an
//! await. Every mutation made by the control loop goes through
//! `with_session`, which refuses to touch a session that was stopped or
//! replaced since the loop started.

use crate::agent::Agent;
use crate::config::{validate_crawl_config, CrawlConfig, Timing};
use crate::crawler::pacing::{navigate_and_wait, pause, Readiness};
use crate::crawler::unit::{is_benign, run_unit, UnitBudget, UnitFailure};
use crate::extractor::{ExtractError, Extractor, FieldValue};
use crate::notify::{BroadcastNotifier, CrawlEvent, Notifier, PhaseDetail, PhaseStart, Progress};
use crate::output::{build_result, CrawlResult, RunStatus};
use crate::session::{ErrorRecord, Phase, Session, SessionSnapshot, TimerSet};
use crate::storage::{persist_result, ResultStore};
use crate::url::{normalize, SiteTable};
use crate::CrawlError;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const OP_COLLECT: &str = "URL collection";
const OP_SCRAPE: &str = "Product scraping";

/// Candidate URLs of this length or shorter are discarded
const MAX_IMPLAUSIBLE_URL_LEN: usize = 10;

/// The current session and the bookkeeping around it
struct Slot {
    session: Session,
    last_generation: u64,
    control: Option<JoinHandle<()>>,
}

struct Shared {
    slot: Mutex<Slot>,
    agent: Arc<dyn Agent>,
    extractor: Arc<dyn Extractor>,
    store: Mutex<Box<dyn ResultStore + Send>>,
    events: BroadcastNotifier,
    notifiers: Vec<Arc<dyn Notifier>>,
    table: SiteTable,
    timing: Timing,
    surface_lost: watch::Sender<u64>,
}

/// Builder for an [`Orchestrator`]
pub struct OrchestratorBuilder {
    agent: Arc<dyn Agent>,
    extractor: Arc<dyn Extractor>,
    store: Box<dyn ResultStore + Send>,
    table: SiteTable,
    timing: Timing,
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl OrchestratorBuilder {
    pub fn site_table(mut self, table: SiteTable) -> Self {
        self.table = table;
        self
    }

    pub fn timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    /// Adds a notifier that receives every event next to the subscribers
    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifiers.push(notifier);
        self
    }

    pub fn build(self) -> Orchestrator {
        let (surface_lost, _) = watch::channel(0);
        Orchestrator {
            shared: Arc::new(Shared {
                slot: Mutex::new(Slot {
                    session: Session::idle(),
                    last_generation: 0,
                    control: None,
                }),
                agent: self.agent,
                extractor: self.extractor,
                store: Mutex::new(self.store),
                events: BroadcastNotifier::default(),
                notifiers: self.notifiers,
                table: self.table,
                timing: self.timing,
                surface_lost,
            }),
        }
    }
}

/// Handle to the crawl orchestrator
///
/// Cloning the handle shares the same session.
#[derive(Clone)]
pub struct Orchestrator {
    shared: Arc<Shared>,
}

impl Orchestrator {
    pub fn builder(
        agent: Arc<dyn Agent>,
        extractor: Arc<dyn Extractor>,
        store: Box<dyn ResultStore + Send>,
    ) -> OrchestratorBuilder {
        OrchestratorBuilder {
            agent,
            extractor,
            store,
            table: SiteTable::default(),
            timing: Timing::default(),
            notifiers: Vec::new(),
        }
    }

    /// Starts a new session, replacing any existing one
    ///
    /// Returns the generation of the new session. An invalid configuration
    /// is rejected before anything is torn down. Must be called from within
    /// a tokio runtime. The phase-start event is emitted by the control loop,
    /// so no notifier runs while the session is locked.
    pub fn start(&self, config: CrawlConfig) -> Result<u64, CrawlError> {
        if let Err(e) = validate_crawl_config(&config) {
            tracing::warn!("Rejected crawl configuration: {}", e);
            self.shared.emit(CrawlEvent::Error {
                message: e.to_string(),
            });
            return Err(e);
        }

        let mut slot = self.shared.lock_slot();

        if slot.session.is_active() {
            tracing::info!(
                "Replacing active session {}",
                slot.session.generation()
            );
        }
        slot.session.release_timers();
        if let Some(previous) = slot.control.take() {
            previous.abort();
        }

        slot.last_generation += 1;
        let generation = slot.last_generation;

        let mut session = Session::new(generation, config.clone(), TimerSet::new());
        session.transition(Phase::CollectingUrls)?;
        let token = session.timers_mut().token();
        slot.session = session;

        tracing::info!(
            "Starting session {}: \"{}\" on {}, pages {}-{}",
            generation,
            config.query.trim(),
            config.site,
            config.start_page,
            config.end_page
        );
        let control = tokio::spawn(run_session(Arc::clone(&self.shared), generation, token));
        slot.session.timers_mut().track(&control);
        slot.control = Some(control);

        Ok(generation)
    }

    /// Stops the active session, persisting a partial result
    ///
    /// Returns false if no session was active. Never waits for in-flight
    /// navigation or extraction.
    pub fn stop(&self) -> bool {
        let (session_id, result) = {
            let mut slot = self.shared.lock_slot();
            let session = &mut slot.session;
            if !session.is_active() {
                return false;
            }

            let result = build_result(session, RunStatus::Stopped);
            if let Err(e) = session.finish(Phase::Stopped) {
                tracing::error!("Cannot stop session {}: {}", session.generation(), e);
                return false;
            }
            session.release_timers();
            tracing::info!(
                "Stopped session {} during {}",
                session.generation(),
                result.summary.stopped_phase.unwrap_or(Phase::Stopped)
            );
            (session.session_id(), result)
        };

        self.shared.persist(session_id, &result);
        self.shared.emit(CrawlEvent::Stopped(Box::new(result)));
        true
    }

    pub fn status(&self) -> SessionSnapshot {
        self.shared.lock_slot().session.snapshot()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CrawlEvent> {
        self.shared.events.subscribe()
    }

    /// Waits until the current control loop has finished or was aborted
    pub async fn wait(&self) {
        let control = self.shared.lock_slot().control.take();
        if let Some(control) = control {
            if let Err(e) = control.await {
                if !e.is_cancelled() {
                    tracing::error!("Control loop failed: {}", e);
                }
            }
        }
    }

    /// Signals that the working surface was lost
    ///
    /// The unit of work in flight fails immediately; the session goes on.
    pub fn surface_lost(&self) {
        tracing::warn!("Page surface lost");
        self.shared.surface_lost.send_modify(|signals| *signals += 1);
    }

    /// Records an error reported by the loaded page
    ///
    /// Benign errors are ignored. Returns true if the error was recorded.
    pub fn report_page_error(&self, message: &str) -> bool {
        if is_benign(message) {
            tracing::debug!("Ignoring non-critical page error: {}", message);
            return false;
        }

        let mut slot = self.shared.lock_slot();
        let session = &mut slot.session;
        if !session.is_active() {
            return false;
        }

        let record = ErrorRecord::new(session.phase(), message)
            .with_page(session.last_page())
            .with_url(session.last_url().map(str::to_string));
        session.record_error(record);
        true
    }

    /// Loads the most recently persisted result
    pub fn latest_result(&self) -> Result<Option<CrawlResult>, CrawlError> {
        Ok(self.shared.lock_store().latest()?)
    }
}

/// Control loop of one session generation
async fn run_session(shared: Arc<Shared>, generation: u64, token: CancellationToken) {
    let mut lost = shared.surface_lost.subscribe();

    let started = shared.with_session(generation, |s| {
        s.config().map(|config| PhaseDetail::Collecting {
            total_pages: config.total_pages(),
            start_page: config.start_page,
            end_page: config.end_page,
        })
    });
    let Some(Some(detail)) = started else {
        return;
    };
    shared.emit(CrawlEvent::PhaseStarted(PhaseStart {
        phase: Phase::CollectingUrls,
        detail,
    }));

    if shared.collect_urls(generation, &token, &mut lost).await.is_none() {
        tracing::debug!("Session {} left URL collection early", generation);
        return;
    }
    if shared.scrape_products(generation, &token, &mut lost).await.is_none() {
        tracing::debug!("Session {} left product scraping early", generation);
        return;
    }
    shared.complete(generation);
}

impl Shared {
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_store(&self) -> MutexGuard<'_, Box<dyn ResultStore + Send>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` on the session if `generation` still owns it
    ///
    /// Returns None for a stopped or replaced session.
    fn with_session<R>(&self, generation: u64, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut slot = self.lock_slot();
        if !slot.session.accepts(generation) {
            return None;
        }
        Some(f(&mut slot.session))
    }

    /// Delivers `event` to every notifier; never called with a lock held
    fn emit(&self, event: CrawlEvent) {
        for notifier in &self.notifiers {
            notifier.notify(event.clone());
        }
        self.events.notify(event);
    }

    fn persist(&self, session_id: i64, result: &CrawlResult) {
        let saved = persist_result(&mut **self.lock_store(), session_id, result);
        match saved {
            Ok(key) => tracing::info!("Saved results as {}", key),
            Err(e) => {
                tracing::error!("Failed to save results: {}", e);
                self.emit(CrawlEvent::Error {
                    message: format!("Failed to save results: {}", e),
                });
            }
        }
    }

    /// Navigates to `url`, waits for readiness, then runs one extraction
    async fn visit<T, F, Fut>(
        &self,
        url: &str,
        timeout: Duration,
        token: &CancellationToken,
        lost: &mut watch::Receiver<u64>,
        call: F,
    ) -> Result<T, UnitFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ExtractError>>,
    {
        // Signals raised before this unit started belong to no unit
        let _ = lost.borrow_and_update();

        match navigate_and_wait(self.agent.as_ref(), url, &self.timing, token, lost).await? {
            Readiness::Ready => {}
            Readiness::CeilingReached => tracing::warn!(
                "Navigation to {} not ready after {:?}, proceeding",
                url,
                self.timing.navigation_ceiling()
            ),
            Readiness::NavigationFailed(message) => {
                tracing::warn!("Navigation to {} failed ({}), proceeding", url, message)
            }
        }

        let budget = UnitBudget {
            timeout,
            retry_delay: self.timing.delivery_retry_delay(),
            token,
        };
        run_unit(budget, lost, call).await
    }

    /// Records a failed unit against the session
    fn record_failure(
        &self,
        generation: u64,
        operation: &str,
        page: Option<u32>,
        url: Option<&str>,
        failure: &UnitFailure,
    ) -> Option<()> {
        let message = failure.to_string();
        if failure.is_benign() {
            tracing::debug!("Ignoring non-critical failure: {}", message);
            return self.with_session(generation, |_| ());
        }

        tracing::warn!(
            "{} failed for {}: {}",
            operation,
            url.unwrap_or("<no url>"),
            message
        );
        self.with_session(generation, |session| {
            let record = ErrorRecord::new(session.phase(), message)
                .with_page(page)
                .with_url(url.map(str::to_string))
                .with_operation(operation);
            session.record_error(record);
        })
    }

    /// Walks the page range; returns None if the session went away
    async fn collect_urls(
        &self,
        generation: u64,
        token: &CancellationToken,
        lost: &mut watch::Receiver<u64>,
    ) -> Option<()> {
        let config = self.with_session(generation, |s| s.config().cloned())??;
        let total_pages = config.total_pages();
        let cap = self.timing.max_urls_per_session;

        loop {
            let page = self.with_session(generation, |s| s.current_page())?;
            if page > config.end_page {
                break;
            }

            let Some(url) = self.table.search_url(config.site, &config.query, page) else {
                let failure = UnitFailure::Failed(format!("No search template for {}", config.site));
                self.record_failure(generation, OP_COLLECT, Some(page), None, &failure)?;
                break;
            };

            self.with_session(generation, |s| {
                s.set_last_page(page);
                s.set_last_url(&url);
            })?;
            tracing::debug!("Collecting URLs from page {}: {}", page, url);

            let outcome = self
                .visit(&url, self.timing.page_timeout(), token, lost, || {
                    self.extractor.collect_urls()
                })
                .await;

            match outcome {
                Err(UnitFailure::Cancelled) => return None,
                Err(failure) => {
                    self.record_failure(generation, OP_COLLECT, Some(page), Some(&url), &failure)?
                }
                Ok(candidates) => {
                    let progress = self.with_session(generation, |s| {
                        let before = s.collected_len();
                        for candidate in &candidates {
                            let candidate = candidate.trim();
                            if candidate.len() <= MAX_IMPLAUSIBLE_URL_LEN {
                                continue;
                            }
                            s.insert_collected(normalize(candidate, &self.table), cap);
                        }
                        s.mark_page_processed();

                        tracing::debug!(
                            "Page {}: {} candidates, {} new unique URLs (total {})",
                            page,
                            candidates.len(),
                            s.collected_len() - before,
                            s.collected_len()
                        );

                        Progress::Page {
                            current_page: page,
                            total_pages,
                            urls_collected: s.collected_len(),
                            pages_scraped: s.pages_processed(),
                            progress: percent(
                                (page - config.start_page + 1) as usize,
                                total_pages as usize,
                            ),
                        }
                    })?;
                    self.emit(CrawlEvent::Progress(progress));
                }
            }

            if !pause(token, self.timing.page_delay()).await {
                return None;
            }

            let cap_reached = self.with_session(generation, |s| {
                s.advance_page();
                s.collected_len() >= cap
            })?;
            if cap_reached {
                tracing::info!("Collected the maximum of {} URLs", cap);
                break;
            }
        }

        let detail = self.with_session(generation, |s| {
            s.begin_details().map(|()| PhaseDetail::Scraping {
                total_urls: s.queue_len(),
                urls_collected: s.collected_len(),
                pages_processed: s.pages_processed(),
            })
        })?;

        match detail {
            Ok(detail) => {
                tracing::info!("URL collection finished: {:?}", detail);
                self.emit(CrawlEvent::PhaseStarted(PhaseStart {
                    phase: Phase::ScrapingDetails,
                    detail,
                }));
                Some(())
            }
            Err(e) => {
                tracing::error!("Cannot enter product scraping: {}", e);
                None
            }
        }
    }

    /// Visits every queued URL; returns None if the session went away
    async fn scrape_products(
        &self,
        generation: u64,
        token: &CancellationToken,
        lost: &mut watch::Receiver<u64>,
    ) -> Option<()> {
        loop {
            let next = self.with_session(generation, |s| {
                s.current_url()
                    .map(|url| (s.cursor(), s.queue_len(), url.to_string()))
            })?;
            let Some((cursor, total, url)) = next else {
                break;
            };

            let key = normalize(&url, &self.table);
            let already_scraped = self.with_session(generation, |s| s.is_scraped(&key))?;
            if already_scraped {
                tracing::debug!("Skipping already scraped {}", url);
                self.with_session(generation, |s| s.advance_cursor())?;
                continue;
            }

            self.with_session(generation, |s| s.set_last_url(&url))?;
            tracing::debug!("Scraping product {}/{}: {}", cursor + 1, total, url);

            let outcome = self
                .visit(&url, self.timing.product_timeout(), token, lost, || {
                    self.extractor.extract_product()
                })
                .await;

            match outcome {
                Err(UnitFailure::Cancelled) => return None,
                Err(failure) => self.record_failure(generation, OP_SCRAPE, None, Some(&url), &failure)?,
                Ok(Some(fields)) if !fields.values().all(FieldValue::is_blank) => {
                    let progress = self.with_session(generation, |s| {
                        s.accept_product(key, fields);
                        Progress::Product {
                            current_product: cursor + 1,
                            total_products: total,
                            products_scraped: s.products().len(),
                            progress: percent(cursor + 1, total),
                            stats: s.stats().clone(),
                            errors: s.errors().len(),
                        }
                    })?;
                    self.emit(CrawlEvent::Progress(progress));
                }
                Ok(_) => tracing::debug!("No fields extracted from {}", url),
            }

            if !pause(token, self.timing.product_delay()).await {
                return None;
            }
            self.with_session(generation, |s| s.advance_cursor())?;
        }

        Some(())
    }

    /// Finishes the session, persists the result and releases its timers
    fn complete(&self, generation: u64) {
        let finished = self.with_session(generation, |s| {
            let result = build_result(s, RunStatus::Completed);
            s.finish(Phase::Complete).map(|()| (s.session_id(), result))
        });

        let (session_id, result) = match finished {
            Some(Ok(finished)) => finished,
            Some(Err(e)) => {
                tracing::error!("Cannot complete session {}: {}", generation, e);
                return;
            }
            None => return,
        };

        tracing::info!(
            "Session {} complete: {} products from {} URLs in {}",
            generation,
            result.summary.products_scraped,
            result.summary.urls_collected,
            result.summary.total_time
        );

        self.persist(session_id, &result);
        self.emit(CrawlEvent::Completed(Box::new(result)));

        let mut slot = self.lock_slot();
        if slot.session.generation() == generation {
            slot.session.release_timers();
        }
    }
}

fn percent(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    done as f64 / total as f64 * 100.0
}
