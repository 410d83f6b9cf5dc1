//! Storage module for persisting crawl results
//!
//! This module handles:
//! - SQLite database initialization and schema management
//! - Storing each session's result under its own key
//! - Keeping the `latest_results` alias pointing at the newest result

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteResultStore;
pub use traits::{
    session_key, ResultStore, StorageError, StorageResult, LATEST_KEY, SESSION_KEY_PREFIX,
};

use crate::output::CrawlResult;
use std::path::Path;

/// Initializes or opens a result store
pub fn open_store(path: &Path) -> StorageResult<SqliteResultStore> {
    SqliteResultStore::new(path)
}

/// Writes `result` under its session key and under [`LATEST_KEY`]
///
/// Returns the session key.
pub fn persist_result(
    store: &mut dyn ResultStore,
    session_id: i64,
    result: &CrawlResult,
) -> StorageResult<String> {
    let key = session_key(session_id);
    store.save(&key, result)?;
    store.save(LATEST_KEY, result)?;
    Ok(key)
}
