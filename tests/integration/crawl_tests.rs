//! Integration tests for the orchestrator
//!
//! These drive whole sessions against a scripted browser, with
//! millisecond pacing or on a paused clock.

use crate::support::{
    fast_timing, finish, listing, orchestrator, phone, product, until, FakeBrowser, Reply,
};
use shelf_sweep::config::{Site, Timing};
use shelf_sweep::notify::{CrawlEvent, Notifier, PhaseDetail, Progress};
use shelf_sweep::output::RunStatus;
use shelf_sweep::storage::SqliteResultStore;
use shelf_sweep::{CrawlConfig, Orchestrator, Phase};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

fn phone_search(start: u32, end: u32) -> CrawlConfig {
    CrawlConfig::new(Site::Flipkart, "phone", start, end)
}

#[tokio::test]
async fn test_pages_then_products_in_order() {
    let browser = Arc::new(
        FakeBrowser::new()
            .reply(listing("phone", 1), Reply::Urls(vec![product("A"), product("B")]))
            .reply(listing("phone", 2), Reply::Urls(vec![product("C")]))
            .reply(listing("phone", 3), Reply::Urls(vec![]))
            .reply(product("A"), phone("Phone A"))
            .reply(product("B"), phone("Phone B"))
            .reply(product("C"), phone("Phone C")),
    );
    let orchestrator = orchestrator(browser.clone(), fast_timing());

    orchestrator.start(phone_search(1, 3)).unwrap();
    finish(&orchestrator).await;

    assert_eq!(
        browser.visits(),
        vec![
            listing("phone", 1),
            listing("phone", 2),
            listing("phone", 3),
            product("A"),
            product("B"),
            product("C"),
        ]
    );

    let status = orchestrator.status();
    assert_eq!(status.phase, Phase::Complete);
    assert!(!status.active);
    assert_eq!(status.pages_processed, 3);
    assert_eq!(status.products_scraped, 3);

    let result = orchestrator.latest_result().unwrap().unwrap();
    assert_eq!(result.summary.status, RunStatus::Completed);
    assert_eq!(result.summary.urls_collected, 3);
    assert_eq!(result.summary.success_rate, "100.0%");
    assert!(result.errors.is_empty());

    let indices: Vec<usize> = result.products.iter().map(|p| p.index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    assert!(result.products.iter().all(|p| p.total_in_batch == 3));
}

#[tokio::test]
async fn test_variants_across_pages_scraped_once() {
    let browser = Arc::new(
        FakeBrowser::new()
            .reply(
                listing("phone", 1),
                Reply::Urls(vec![
                    "https://www.flipkart.com/item/p/itm?pid=A&lid=LST1".to_string(),
                    "short".to_string(),
                    "   ".to_string(),
                ]),
            )
            .reply(
                listing("phone", 2),
                Reply::Urls(vec![
                    "https://dl.flipkart.com/item/p/itm?pid=A#reviews".to_string(),
                    product("A"),
                ]),
            )
            .reply(product("A"), phone("Phone A")),
    );
    let orchestrator = orchestrator(browser.clone(), fast_timing());

    orchestrator.start(phone_search(1, 2)).unwrap();
    finish(&orchestrator).await;

    let product_visits = browser
        .visits()
        .into_iter()
        .filter(|url| url.contains("pid="))
        .count();
    assert_eq!(product_visits, 1);

    let result = orchestrator.latest_result().unwrap().unwrap();
    assert_eq!(result.summary.urls_collected, 1);
    assert_eq!(result.products.len(), 1);
    assert_eq!(result.products[0].url, product("A"));
}

#[tokio::test]
async fn test_hanging_extraction_records_one_timeout() {
    let browser = Arc::new(
        FakeBrowser::new()
            .reply(listing("phone", 1), Reply::Urls(vec![product("A"), product("B")]))
            .reply(product("A"), Reply::Hang)
            .reply(product("B"), phone("Phone B")),
    );
    let orchestrator = orchestrator(browser, fast_timing());

    orchestrator.start(phone_search(1, 1)).unwrap();
    finish(&orchestrator).await;

    let result = orchestrator.latest_result().unwrap().unwrap();
    assert_eq!(result.errors.len(), 1);

    let error = &result.errors[0];
    assert_eq!(error.phase, Phase::ScrapingDetails);
    assert_eq!(error.message, "Processing timeout after 300ms");
    assert_eq!(error.operation.as_deref(), Some("Product scraping"));
    assert_eq!(error.url.as_deref(), Some(product("A").as_str()));

    assert_eq!(result.products.len(), 1);
    assert_eq!(result.products[0].index, 2);
    assert_eq!(result.summary.success_rate, "50.0%");
}

#[tokio::test]
async fn test_failed_listing_page_is_recorded_and_skipped() {
    let browser = Arc::new(
        FakeBrowser::new()
            .reply(listing("phone", 1), Reply::Fail("listing markup changed"))
            .reply(listing("phone", 2), Reply::Urls(vec![product("A")]))
            .reply(product("A"), phone("Phone A")),
    );
    let orchestrator = orchestrator(browser, fast_timing());

    orchestrator.start(phone_search(1, 2)).unwrap();
    finish(&orchestrator).await;

    let result = orchestrator.latest_result().unwrap().unwrap();
    assert_eq!(result.summary.pages_processed, 1);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].page, Some(1));
    assert_eq!(result.errors[0].operation.as_deref(), Some("URL collection"));
    assert_eq!(result.products.len(), 1);
}

#[tokio::test]
async fn test_only_benign_delivery_failures_are_dropped() {
    let browser = Arc::new(
        FakeBrowser::new()
            .reply(
                listing("phone", 1),
                Reply::Urls(vec![product("A"), product("B"), product("C")]),
            )
            .reply(product("A"), Reply::Undeliverable("net::ERR_ABORTED while loading"))
            .reply(product("B"), Reply::Fail("price selector missing on item MOB4066"))
            .reply(product("C"), Reply::Undeliverable("page not attached")),
    );
    let orchestrator = orchestrator(browser, fast_timing());

    orchestrator.start(phone_search(1, 1)).unwrap();
    finish(&orchestrator).await;

    let result = orchestrator.latest_result().unwrap().unwrap();
    assert!(result.products.is_empty());

    let failed: Vec<Option<&str>> = result.errors.iter().map(|e| e.url.as_deref()).collect();
    assert_eq!(
        failed,
        vec![Some(product("B").as_str()), Some(product("C").as_str())]
    );
    assert_eq!(result.errors[0].message, "price selector missing on item MOB4066");
}

#[tokio::test]
async fn test_empty_field_map_adds_nothing() {
    let browser = Arc::new(
        FakeBrowser::new()
            .reply(listing("phone", 1), Reply::Urls(vec![product("A"), product("B")]))
            .reply(product("A"), Reply::Fields(vec![]))
            .reply(product("B"), Reply::Fields(vec![("title", "  "), ("price", "")])),
    );
    let orchestrator = orchestrator(browser, fast_timing());

    orchestrator.start(phone_search(1, 1)).unwrap();
    finish(&orchestrator).await;

    let status = orchestrator.status();
    assert_eq!(status.products_scraped, 0);
    assert_eq!(status.stats.total_parameters, 0);

    let result = orchestrator.latest_result().unwrap().unwrap();
    assert!(result.products.is_empty());
    assert!(result.errors.is_empty());
    assert_eq!(result.summary.success_rate, "0.0%");
    assert_eq!(result.summary.duplicates_skipped, 2);
}

#[tokio::test]
async fn test_empty_product_page_adds_nothing() {
    let browser = Arc::new(
        FakeBrowser::new()
            .reply(listing("phone", 1), Reply::Urls(vec![product("A")]))
            .reply(product("A"), Reply::Nothing),
    );
    let orchestrator = orchestrator(browser, fast_timing());

    orchestrator.start(phone_search(1, 1)).unwrap();
    finish(&orchestrator).await;

    let result = orchestrator.latest_result().unwrap().unwrap();
    assert!(result.products.is_empty());
    assert!(result.errors.is_empty());
    assert_eq!(result.summary.success_rate, "0.0%");
}

#[tokio::test]
async fn test_no_urls_completes_with_zero_rate() {
    let browser = Arc::new(FakeBrowser::new());
    let orchestrator = orchestrator(browser, fast_timing());

    orchestrator.start(phone_search(1, 2)).unwrap();
    finish(&orchestrator).await;

    let result = orchestrator.latest_result().unwrap().unwrap();
    assert_eq!(result.summary.status, RunStatus::Completed);
    assert_eq!(result.summary.urls_collected, 0);
    assert_eq!(result.summary.success_rate, "0%");
}

#[tokio::test]
async fn test_url_cap_ends_collection_early() {
    let mut timing = fast_timing();
    timing.max_urls_per_session = 2;
    let browser = Arc::new(
        FakeBrowser::new()
            .reply(
                listing("phone", 1),
                Reply::Urls(vec![product("A"), product("B"), product("C")]),
            )
            .reply(listing("phone", 2), Reply::Urls(vec![product("D")])),
    );
    let orchestrator = orchestrator(browser.clone(), timing);

    orchestrator.start(phone_search(1, 3)).unwrap();
    finish(&orchestrator).await;

    assert!(!browser.visits().contains(&listing("phone", 2)));
    let result = orchestrator.latest_result().unwrap().unwrap();
    assert_eq!(result.summary.urls_collected, 2);
}

#[tokio::test]
async fn test_stop_freezes_session() {
    let mut timing = fast_timing();
    timing.product_timeout = 60_000;
    let browser = Arc::new(
        FakeBrowser::new()
            .reply(listing("phone", 1), Reply::Urls(vec![product("A"), product("B")]))
            .reply(product("A"), phone("Phone A"))
            .reply(product("B"), Reply::Hang),
    );
    let orchestrator = orchestrator(browser.clone(), timing);

    orchestrator.start(phone_search(1, 1)).unwrap();
    until(&orchestrator, |s| s.products_scraped == 1 && s.cursor == 1).await;
    until(&orchestrator, |_| browser.visits().contains(&product("B"))).await;

    assert!(orchestrator.stop());
    assert!(!orchestrator.stop());

    let status = orchestrator.status();
    assert!(!status.active);
    assert_eq!(status.phase, Phase::Stopped);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(orchestrator.status(), status);

    let result = orchestrator.latest_result().unwrap().unwrap();
    assert_eq!(result.summary.status, RunStatus::Stopped);
    assert_eq!(result.summary.stopped_phase, Some(Phase::ScrapingDetails));
    assert_eq!(result.summary.products_scraped, result.products.len());
    assert_eq!(result.products.len(), 1);
}

#[tokio::test]
async fn test_stop_without_session_is_noop() {
    let orchestrator = orchestrator(Arc::new(FakeBrowser::new()), fast_timing());
    assert!(!orchestrator.stop());
    assert_eq!(orchestrator.status().phase, Phase::Idle);
    assert!(orchestrator.latest_result().unwrap().is_none());
}

#[tokio::test]
async fn test_restart_discards_previous_session() {
    let mut timing = fast_timing();
    timing.page_timeout = 60_000;
    let browser = Arc::new(
        FakeBrowser::new()
            .reply(listing("tv", 1), Reply::Hang)
            .reply(listing("phone", 1), Reply::Urls(vec![product("A")]))
            .reply(product("A"), phone("Phone A")),
    );
    let orchestrator = orchestrator(browser.clone(), timing);

    let first = orchestrator
        .start(CrawlConfig::new(Site::Flipkart, "tv", 1, 5))
        .unwrap();
    until(&orchestrator, |_| browser.visits().contains(&listing("tv", 1))).await;

    let second = orchestrator.start(phone_search(1, 1)).unwrap();
    assert!(second > first);
    finish(&orchestrator).await;

    let status = orchestrator.status();
    assert_eq!(status.generation, second);
    assert_eq!(status.phase, Phase::Complete);
    assert_eq!(status.pages_processed, 1);
    assert_eq!(status.error_count, 0);

    let visits = browser.visits();
    assert_eq!(visits.iter().filter(|url| url.contains("q=tv")).count(), 1);

    let result = orchestrator.latest_result().unwrap().unwrap();
    assert_eq!(result.config.unwrap().query, "phone");
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let orchestrator = orchestrator(Arc::new(FakeBrowser::new()), fast_timing());
    let mut events = orchestrator.subscribe();

    assert!(orchestrator.start(phone_search(3, 1)).is_err());
    assert!(orchestrator
        .start(CrawlConfig::new(Site::Flipkart, " a ", 1, 1))
        .is_err());

    assert!(matches!(events.try_recv(), Ok(CrawlEvent::Error { .. })));
    assert_eq!(orchestrator.status().phase, Phase::Idle);
    assert!(!orchestrator.status().active);
}

#[tokio::test]
async fn test_surface_loss_fails_only_current_unit() {
    let mut timing = fast_timing();
    timing.product_timeout = 60_000;
    let browser = Arc::new(
        FakeBrowser::new()
            .reply(listing("phone", 1), Reply::Urls(vec![product("A"), product("B")]))
            .reply(product("A"), Reply::Hang)
            .reply(product("B"), phone("Phone B")),
    );
    let orchestrator = orchestrator(browser.clone(), timing);

    orchestrator.start(phone_search(1, 1)).unwrap();
    until(&orchestrator, |_| browser.visits().contains(&product("A"))).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    orchestrator.surface_lost();
    finish(&orchestrator).await;

    let result = orchestrator.latest_result().unwrap().unwrap();
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].url.as_deref(), Some(product("A").as_str()));
    assert_eq!(result.products.len(), 1);
    assert_eq!(result.products[0].url, product("B"));
}

#[tokio::test]
async fn test_page_errors_filtered_and_attributed() {
    let mut timing = fast_timing();
    timing.page_timeout = 60_000;
    let browser = Arc::new(FakeBrowser::new().reply(listing("phone", 2), Reply::Hang));
    let orchestrator = orchestrator(browser.clone(), timing);

    orchestrator.start(phone_search(2, 2)).unwrap();
    until(&orchestrator, |_| browser.visits().contains(&listing("phone", 2))).await;

    assert!(!orchestrator.report_page_error("POST https://www.facebook.com/tr 406"));
    assert!(orchestrator.report_page_error("Uncaught TypeError: x is undefined"));
    assert!(orchestrator.stop());
    assert!(!orchestrator.report_page_error("after stop"));

    let result = orchestrator.latest_result().unwrap().unwrap();
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].phase, Phase::CollectingUrls);
    assert_eq!(result.errors[0].page, Some(2));
    assert_eq!(result.errors[0].url.as_deref(), Some(listing("phone", 2).as_str()));
}

#[tokio::test]
async fn test_event_sequence() {
    let browser = Arc::new(
        FakeBrowser::new()
            .reply(listing("phone", 1), Reply::Urls(vec![product("A")]))
            .reply(product("A"), phone("Phone A")),
    );
    let orchestrator = orchestrator(browser, fast_timing());
    let mut events = orchestrator.subscribe();

    orchestrator.start(phone_search(1, 1)).unwrap();
    finish(&orchestrator).await;

    let mut received = Vec::new();
    while let Ok(event) = events.try_recv() {
        received.push(event);
    }
    assert_eq!(received.len(), 5);

    assert!(matches!(
        &received[0],
        CrawlEvent::PhaseStarted(start)
            if start.phase == Phase::CollectingUrls
                && start.detail
                    == (PhaseDetail::Collecting { total_pages: 1, start_page: 1, end_page: 1 })
    ));
    assert!(matches!(
        &received[1],
        CrawlEvent::Progress(Progress::Page { current_page: 1, urls_collected: 1, progress, .. })
            if *progress == 100.0
    ));
    assert!(matches!(
        &received[2],
        CrawlEvent::PhaseStarted(start) if start.phase == Phase::ScrapingDetails
    ));
    assert!(matches!(
        &received[3],
        CrawlEvent::Progress(Progress::Product { current_product: 1, total_products: 1, products_scraped: 1, .. })
    ));
    match &received[4] {
        CrawlEvent::Completed(result) => assert_eq!(result.products.len(), 1),
        other => panic!("expected completion, got {:?}", other),
    }
}

/// Notifier that reads the orchestrator's status on every event
#[derive(Default)]
struct StatusReader {
    orchestrator: OnceLock<Orchestrator>,
    phases: Mutex<Vec<Phase>>,
}

impl Notifier for StatusReader {
    fn notify(&self, _event: CrawlEvent) {
        if let Some(orchestrator) = self.orchestrator.get() {
            let phase = orchestrator.status().phase;
            self.phases.lock().unwrap().push(phase);
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_notifier_may_query_status() {
    let browser = Arc::new(
        FakeBrowser::new()
            .reply(listing("phone", 1), Reply::Urls(vec![product("A")]))
            .reply(product("A"), phone("Phone A")),
    );
    let reader = Arc::new(StatusReader::default());
    let store = SqliteResultStore::new_in_memory().unwrap();
    let orchestrator = Orchestrator::builder(browser.clone(), browser, Box::new(store))
        .timing(fast_timing())
        .notifier(reader.clone())
        .build();
    reader.orchestrator.set(orchestrator.clone()).ok().unwrap();

    let starter = orchestrator.clone();
    let started = tokio::task::spawn_blocking(move || starter.start(phone_search(1, 1)));
    tokio::time::timeout(Duration::from_secs(2), started)
        .await
        .expect("start blocked on a notifier")
        .unwrap()
        .unwrap();
    finish(&orchestrator).await;

    let phases = reader.phases.lock().unwrap().clone();
    assert_eq!(phases.first(), Some(&Phase::CollectingUrls));
    assert_eq!(phases.last(), Some(&Phase::Complete));
    assert!(phases.contains(&Phase::ScrapingDetails));
}

#[tokio::test(start_paused = true)]
async fn test_units_are_paced_by_configured_delays() {
    let timing = Timing::default();
    let browser = Arc::new(
        FakeBrowser::new()
            .reply(listing("phone", 1), Reply::Urls(vec![product("A")]))
            .reply(listing("phone", 2), Reply::Urls(vec![product("B")]))
            .reply(listing("phone", 3), Reply::Urls(vec![product("C")]))
            .reply(product("A"), phone("Phone A"))
            .reply(product("B"), Reply::Fail("price selector missing"))
            .reply(product("C"), phone("Phone C")),
    );
    let orchestrator = orchestrator(browser.clone(), timing.clone());

    orchestrator.start(phone_search(1, 3)).unwrap();
    tokio::time::timeout(Duration::from_secs(3_600), orchestrator.wait())
        .await
        .expect("session did not finish");
    assert_eq!(orchestrator.status().phase, Phase::Complete);

    let pages = browser.visit_times("/search?");
    assert_eq!(pages.len(), 3);
    for pair in pages.windows(2) {
        assert!(pair[1] - pair[0] >= timing.page_delay());
    }

    let products = browser.visit_times("pid=");
    assert_eq!(products.len(), 3);
    assert!(products[0] - pages[2] >= timing.page_delay());
    for pair in products.windows(2) {
        assert!(pair[1] - pair[0] >= timing.product_delay());
    }
}
