//! End-to-end tests over HTTP
//!
//! These use wiremock to serve store pages and drive the real
//! `HttpAgent` and `HtmlExtractor` through a full session.

use crate::support::fast_timing;
use shelf_sweep::agent::HttpAgent;
use shelf_sweep::config::{Site, SiteEntry, UserAgentConfig};
use shelf_sweep::extractor::{FieldValue, HtmlExtractor};
use shelf_sweep::output::{CsvExport, ReportWriter, RunStatus};
use shelf_sweep::storage::{ResultStore, SqliteResultStore, LATEST_KEY};
use shelf_sweep::{CrawlConfig, Orchestrator, Phase, SiteTable};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Site table pointing the Flipkart family at the mock server
fn mock_table(server: &MockServer) -> SiteTable {
    SiteTable::with_overrides(&[SiteEntry {
        site: Site::Flipkart,
        search_template: Some(format!("{}/search?q={{query}}&page={{page}}", server.uri())),
        canonical_host: Some("127.0.0.1".to_string()),
        host_patterns: Some(vec!["127.0.0.1".to_string()]),
        keep_params: None,
    }])
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

async fn mount_store(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "1"))
        .respond_with(html(
            r#"<a href="/phone-a/p/itm1?pid=A&lid=L1">Phone A</a>
               <a href="/phone-b/p/itm2?pid=B">Phone B</a>
               <a href="/phone-a/p/itm1?pid=A&lid=L2#specs">Phone A again</a>
               <a href="/help">Help</a>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/phone-a/p/itm1"))
        .respond_with(html(
            r#"<h1> Phone   A </h1>
               <div class="_30jeq3 _16Jk6d">₹9,999</div>
               <div class="_3LWZlK">4.3</div>
               <ul><li class="color-swatch">Black</li><li class="color-swatch">Blue</li></ul>"#,
        ))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/phone-b/p/itm2"))
        .respond_with(html("<p>Out of stock</p>"))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_full_session_over_http() {
    let server = MockServer::start().await;
    mount_store(&server).await;

    let table = mock_table(&server);
    let agent = HttpAgent::new(&UserAgentConfig::default()).unwrap();
    let extractor = HtmlExtractor::new(agent.surface(), table.clone());

    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("results.db");
    let store = SqliteResultStore::new(&db_path).unwrap();

    let orchestrator = Orchestrator::builder(Arc::new(agent), Arc::new(extractor), Box::new(store))
        .site_table(table)
        .timing(fast_timing())
        .build();

    orchestrator
        .start(CrawlConfig::new(Site::Flipkart, "phone", 1, 2))
        .unwrap();
    tokio::time::timeout(Duration::from_secs(10), orchestrator.wait())
        .await
        .expect("session did not finish");

    let status = orchestrator.status();
    assert_eq!(status.phase, Phase::Complete);
    assert_eq!(status.pages_processed, 1);
    assert_eq!(status.urls_collected, 2);

    let result = orchestrator.latest_result().unwrap().unwrap();
    assert_eq!(result.summary.status, RunStatus::Completed);
    assert_eq!(result.products.len(), 1);

    let phone = &result.products[0];
    assert_eq!(phone.url, format!("{}/phone-a/p/itm1?pid=A", server.uri()));
    assert_eq!(phone.fields.get("title"), Some(&FieldValue::from("Phone A")));
    assert_eq!(phone.fields.get("price"), Some(&FieldValue::from("₹9,999")));
    assert_eq!(
        phone.fields.get("available colors"),
        Some(&FieldValue::from(vec!["Black".to_string(), "Blue".to_string()]))
    );

    // Page 2 answered 404, so nothing could be read from it
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].page, Some(2));
    assert_eq!(result.errors[0].operation.as_deref(), Some("URL collection"));

    // The stored result survives reopening the database
    drop(orchestrator);
    let reopened = SqliteResultStore::new(&db_path).unwrap();
    let keys = reopened.list_keys().unwrap();
    assert_eq!(keys.len(), 2);
    assert!(keys.iter().any(|key| key == LATEST_KEY));
    assert_eq!(reopened.latest().unwrap(), Some(result.clone()));

    let csv_path = temp_dir.path().join("products.csv");
    CsvExport.write_to_path(&result, &csv_path).unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 2);
    assert!(csv.contains("\"Phone A\""));
}
