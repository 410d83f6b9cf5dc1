use crate::extractor::ProductFields;
use crate::session::Phase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A product record as returned by the extractor, enriched with its
/// position in the batch and the session that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(flatten)]
    pub fields: ProductFields,

    /// 1-based position in the product queue
    #[serde(rename = "scrapedIndex")]
    pub index: usize,

    #[serde(rename = "totalInBatch")]
    pub total_in_batch: usize,

    /// Start time of the producing session, in epoch milliseconds
    #[serde(rename = "scrapingSession")]
    pub session_id: i64,

    #[serde(rename = "productUrl")]
    pub url: String,

    #[serde(rename = "extractionTimestamp")]
    pub extracted_at: DateTime<Utc>,
}

/// A failure recorded against a unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub phase: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            phase,
            page: None,
            url: None,
            operation: None,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_page(mut self, page: Option<u32>) -> Self {
        self.page = page;
        self
    }

    pub fn with_url(mut self, url: Option<String>) -> Self {
        self.url = url;
        self
    }

    pub fn with_operation(mut self, operation: &str) -> Self {
        self.operation = Some(operation.to_string());
        self
    }
}
