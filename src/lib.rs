//! Shelf-Sweep: a two-phase product crawler for paginated store search results
//!
//! A session first walks a range of search result pages collecting unique
//! product URLs, then visits each product page and extracts a structured
//! record. One unit of work is in flight at a time, paced like a single
//! human browsing session.

pub mod agent;
pub mod config;
pub mod crawler;
pub mod extractor;
pub mod notify;
pub mod output;
pub mod session;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Shelf-Sweep operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid crawl configuration: {0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid phase transition: {from} -> {to}")]
    InvalidTransition {
        from: session::Phase,
        to: session::Phase,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid host pattern: {0}")]
    InvalidPattern(String),
}

/// Result type alias for Shelf-Sweep operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{CrawlConfig, Settings, Site};
pub use crawler::Orchestrator;
pub use session::{Phase, SessionSnapshot};
pub use url::{normalize, SiteTable};
