//! Output traits and types
//!
//! This module defines the persisted result object, its summary, and the
//! trait implemented by every report format.

use crate::config::CrawlConfig;
use crate::output::stats::DetailedStats;
use crate::session::{ErrorRecord, Phase, ProductRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("Nothing to export: {0}")]
    Empty(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Stopped,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary statistics for a finished or stopped session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlSummary {
    pub status: RunStatus,

    /// Phase the session was in when stopped
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped_phase: Option<Phase>,

    pub total_time: String,
    pub pages_processed: u32,
    pub urls_collected: usize,
    pub products_scraped: usize,
    pub duplicates_skipped: usize,
    pub success_rate: String,
    pub avg_params_per_product: f64,
    pub error_count: usize,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub stats: DetailedStats,
}

/// The object persisted at the end of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    pub summary: CrawlSummary,
    pub products: Vec<ProductRecord>,
    pub errors: Vec<ErrorRecord>,
    pub config: Option<CrawlConfig>,
}

/// A report format for stored results
pub trait ReportWriter {
    /// Writes `result` to `out`
    fn write_report(&self, result: &CrawlResult, out: &mut dyn Write) -> OutputResult<()>;

    /// Writes `result` to a new file at `path`
    fn write_to_path(&self, result: &CrawlResult, path: &Path) -> OutputResult<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_report(result, &mut out)?;
        out.flush()?;
        Ok(())
    }
}
