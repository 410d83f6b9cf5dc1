//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the ResultStore trait.
//! Result objects are stored as JSON text.

use crate::output::CrawlResult;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{ResultStore, StorageResult, LATEST_KEY, SESSION_KEY_PREFIX};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite result store
pub struct SqliteResultStore {
    conn: Connection,
}

impl SqliteResultStore {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

impl ResultStore for SqliteResultStore {
    fn save(&mut self, key: &str, result: &CrawlResult) -> StorageResult<()> {
        let payload = serde_json::to_string(result)?;
        let session_id = result.summary.started_at.timestamp_millis();

        self.conn.execute(
            "INSERT OR REPLACE INTO results (key, saved_at, status, session_id, payload)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key,
                Utc::now().to_rfc3339(),
                result.summary.status.as_str(),
                session_id,
                payload
            ],
        )?;

        tracing::debug!("Stored result under {} ({} bytes)", key, payload.len());
        Ok(())
    }

    fn load(&self, key: &str) -> StorageResult<Option<CrawlResult>> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload FROM results WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn list_keys(&self) -> StorageResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM results ORDER BY saved_at DESC, key")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut keys = Vec::new();
        for row in rows {
            keys.push(row?);
        }

        Ok(keys)
    }

    fn clear(&mut self) -> StorageResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM results WHERE key = ?1 OR key LIKE ?2",
            params![LATEST_KEY, format!("{}%", SESSION_KEY_PREFIX)],
        )?;
        Ok(removed)
    }
}
