//! Extraction of structured data from a loaded page
//!
//! The orchestrator only sees the [`Extractor`] trait. [`HtmlExtractor`]
//! is the shipped implementation, reading the document held by the HTTP
//! agent's page surface.

mod html;

pub use html::HtmlExtractor;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Field names produced by the shipped extractor and counted by the
/// result aggregator
pub mod fields {
    pub const TITLE: &str = "title";
    pub const PRICE: &str = "price";
    pub const RATING: &str = "rating";
    pub const RATING_BREAKDOWN: &str = "rating breakdown";
    pub const AVAILABLE_COLORS: &str = "available colors";
    pub const DELIVERY_TYPES: &str = "delivery types";
    pub const PAYMENT_METHODS: &str = "payment methods";
    pub const PRODUCT_HIGHLIGHTS: &str = "product highlights";
}

/// Errors returned by an extractor
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The request never reached a loaded page; worth one retry
    #[error("Could not deliver extraction request: {0}")]
    Delivery(String),

    #[error("Extraction failed: {0}")]
    Failed(String),
}

impl ExtractError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Delivery(_))
    }
}

/// A single extracted value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// Number of non-blank entries held by the value
    pub fn item_count(&self) -> usize {
        match self {
            Self::Text(text) => usize::from(!text.trim().is_empty()),
            Self::List(items) => items.iter().filter(|i| !i.trim().is_empty()).count(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.item_count() == 0
    }

    /// Flattens the value into one line, joining lists with `"; "`
    pub fn to_display_string(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::List(items) => items.join("; "),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

/// Field name to value, as returned by an extractor
pub type ProductFields = BTreeMap<String, FieldValue>;

/// Reads structured data out of the page the agent last loaded
///
/// Calls may hang; the orchestrator races every call against its own timeout.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Returns candidate product URLs from a listing page
    async fn collect_urls(&self) -> Result<Vec<String>, ExtractError>;

    /// Returns the product's fields, or `None` when the page yields nothing
    async fn extract_product(&self) -> Result<Option<ProductFields>, ExtractError>;
}
