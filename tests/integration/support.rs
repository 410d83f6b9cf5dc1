//! Scripted agent and extractor shared by the integration tests

use async_trait::async_trait;
use shelf_sweep::agent::{Agent, AgentError, LoadStatus};
use shelf_sweep::config::{Site, Timing};
use shelf_sweep::extractor::{ExtractError, Extractor, FieldValue, ProductFields};
use shelf_sweep::storage::SqliteResultStore;
use shelf_sweep::{Orchestrator, SessionSnapshot, SiteTable};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// What the fake browser answers for one URL
#[derive(Debug, Clone)]
pub enum Reply {
    Urls(Vec<String>),
    Fields(Vec<(&'static str, &'static str)>),
    Nothing,
    Hang,
    Fail(&'static str),
    Undeliverable(&'static str),
}

/// A browser that answers from a script keyed by the last navigated URL
#[derive(Debug, Default)]
pub struct FakeBrowser {
    replies: HashMap<String, Reply>,
    current: Mutex<Option<String>>,
    visits: Mutex<Vec<(String, Instant)>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, url: impl Into<String>, reply: Reply) -> Self {
        self.replies.insert(url.into(), reply);
        self
    }

    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().iter().map(|(url, _)| url.clone()).collect()
    }

    /// Navigation times of every visit whose URL contains `marker`
    pub fn visit_times(&self, marker: &str) -> Vec<Instant> {
        self.visits
            .lock()
            .unwrap()
            .iter()
            .filter(|(url, _)| url.contains(marker))
            .map(|(_, at)| *at)
            .collect()
    }

    fn current_reply(&self) -> Option<Reply> {
        let current = self.current.lock().unwrap().clone()?;
        self.replies.get(&current).cloned()
    }
}

#[async_trait]
impl Agent for FakeBrowser {
    async fn navigate(&self, url: &str) -> Result<(), AgentError> {
        self.visits
            .lock()
            .unwrap()
            .push((url.to_string(), Instant::now()));
        *self.current.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn check_status(&self) -> Result<LoadStatus, AgentError> {
        Ok(LoadStatus::Complete)
    }
}

#[async_trait]
impl Extractor for FakeBrowser {
    async fn collect_urls(&self) -> Result<Vec<String>, ExtractError> {
        match self.current_reply() {
            Some(Reply::Urls(urls)) => Ok(urls),
            Some(Reply::Hang) => std::future::pending().await,
            Some(Reply::Fail(message)) => Err(ExtractError::Failed(message.to_string())),
            Some(Reply::Undeliverable(message)) => {
                Err(ExtractError::Delivery(message.to_string()))
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn extract_product(&self) -> Result<Option<ProductFields>, ExtractError> {
        match self.current_reply() {
            Some(Reply::Fields(pairs)) => Ok(Some(
                pairs
                    .into_iter()
                    .map(|(name, value)| (name.to_string(), FieldValue::from(value)))
                    .collect(),
            )),
            Some(Reply::Hang) => std::future::pending().await,
            Some(Reply::Fail(message)) => Err(ExtractError::Failed(message.to_string())),
            Some(Reply::Undeliverable(message)) => {
                Err(ExtractError::Delivery(message.to_string()))
            }
            _ => Ok(None),
        }
    }
}

/// Millisecond-scale pacing so whole sessions finish quickly
pub fn fast_timing() -> Timing {
    Timing {
        page_timeout: 300,
        product_timeout: 300,
        page_delay: 1,
        product_delay: 1,
        poll_interval: 1,
        navigation_ceiling: 500,
        settle_delay: 1,
        delivery_retry_delay: 5,
        max_urls_per_session: 500,
    }
}

/// Listing URL of `page` for a Flipkart search
pub fn listing(query: &str, page: u32) -> String {
    SiteTable::default()
        .search_url(Site::Flipkart, query, page)
        .unwrap()
}

/// Canonical product URL with the given product id
pub fn product(pid: &str) -> String {
    format!("https://www.flipkart.com/item/p/itm?pid={}", pid)
}

pub fn phone(title: &'static str) -> Reply {
    Reply::Fields(vec![("title", title), ("price", "₹9,999"), ("rating", "4.2")])
}

pub fn orchestrator(browser: Arc<FakeBrowser>, timing: Timing) -> Orchestrator {
    let store = SqliteResultStore::new_in_memory().unwrap();
    Orchestrator::builder(browser.clone(), browser, Box::new(store))
        .timing(timing)
        .build()
}

/// Waits for the control loop, failing the test if it runs away
pub async fn finish(orchestrator: &Orchestrator) {
    tokio::time::timeout(Duration::from_secs(10), orchestrator.wait())
        .await
        .expect("session did not finish");
}

/// Polls `status()` until `done` holds
pub async fn until(orchestrator: &Orchestrator, done: impl Fn(&SessionSnapshot) -> bool) {
    for _ in 0..1_000 {
        if done(&orchestrator.status()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition never held: {:?}", orchestrator.status());
}
