//! Storage traits and error types

use crate::output::CrawlResult;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Key the most recent result is always written under
pub const LATEST_KEY: &str = "latest_results";

/// Prefix of the per-session keys
pub const SESSION_KEY_PREFIX: &str = "scraping_results_";

/// Per-session key for a session started at `session_id` epoch milliseconds
pub fn session_key(session_id: i64) -> String {
    format!("{}{}", SESSION_KEY_PREFIX, session_id)
}

/// Key/value store for finished (or stopped) session results
pub trait ResultStore {
    /// Writes `result` under `key`, replacing any previous value
    fn save(&mut self, key: &str, result: &CrawlResult) -> StorageResult<()>;

    fn load(&self, key: &str) -> StorageResult<Option<CrawlResult>>;

    /// Loads the result stored under [`LATEST_KEY`]
    fn latest(&self) -> StorageResult<Option<CrawlResult>> {
        self.load(LATEST_KEY)
    }

    /// Lists stored keys, most recently saved first
    fn list_keys(&self) -> StorageResult<Vec<String>>;

    /// Removes the latest alias and every per-session result
    ///
    /// Returns the number of removed entries.
    fn clear(&mut self) -> StorageResult<usize>;
}
