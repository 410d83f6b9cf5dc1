//! Database schema for stored crawl results

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per stored result object, keyed by session or by the latest alias
CREATE TABLE IF NOT EXISTS results (
    key TEXT PRIMARY KEY,
    saved_at TEXT NOT NULL,
    status TEXT NOT NULL,
    session_id INTEGER NOT NULL,
    payload TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_results_saved_at ON results(saved_at);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
