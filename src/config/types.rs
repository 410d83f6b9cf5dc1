use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Store families the crawler knows how to walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    Flipkart,
    Amazon,
}

impl Site {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Flipkart => "flipkart",
            Self::Amazon => "amazon",
        }
    }

    pub fn all() -> [Self; 2] {
        [Self::Flipkart, Self::Amazon]
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Site {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "flipkart" => Ok(Self::Flipkart),
            "amazon" => Ok(Self::Amazon),
            other => Err(ConfigError::Validation(format!(
                "Unsupported website '{}'",
                other
            ))),
        }
    }
}

/// Parameters of a single crawl session
///
/// Immutable once the session has started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlConfig {
    pub site: Site,
    pub query: String,
    pub start_page: u32,
    pub end_page: u32,
}

impl CrawlConfig {
    pub fn new(site: Site, query: impl Into<String>, start_page: u32, end_page: u32) -> Self {
        Self {
            site,
            query: query.into(),
            start_page,
            end_page,
        }
    }

    /// Number of listing pages in the configured range
    pub fn total_pages(&self) -> u32 {
        (self.end_page + 1).saturating_sub(self.start_page)
    }
}

/// Settings file loaded by the command-line front-end
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub timing: Timing,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    /// Per-site overrides of the built-in site table
    #[serde(rename = "site", default)]
    pub sites: Vec<SiteEntry>,
}

/// Pacing and timeout budget for a session, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Timing {
    /// Budget for collecting URLs from one listing page
    pub page_timeout: u64,
    /// Budget for extracting one product page
    pub product_timeout: u64,
    /// Pause between listing pages
    pub page_delay: u64,
    /// Pause between product pages
    pub product_delay: u64,
    /// Interval between readiness checks while navigating
    pub poll_interval: u64,
    /// Hard ceiling on the readiness wait
    pub navigation_ceiling: u64,
    /// Pause after the page reports ready
    pub settle_delay: u64,
    /// Pause before re-sending a request that failed to deliver
    pub delivery_retry_delay: u64,
    /// Cap on unique product URLs collected per session
    pub max_urls_per_session: usize,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            page_timeout: 25_000,
            product_timeout: 30_000,
            page_delay: 5_000,
            product_delay: 6_000,
            poll_interval: 800,
            navigation_ceiling: 30_000,
            settle_delay: 3_000,
            delivery_retry_delay: 1_200,
            max_urls_per_session: 500,
        }
    }
}

impl Timing {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout)
    }

    pub fn product_timeout(&self) -> Duration {
        Duration::from_millis(self.product_timeout)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay)
    }

    pub fn product_delay(&self) -> Duration {
        Duration::from_millis(self.product_delay)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval)
    }

    pub fn navigation_ceiling(&self) -> Duration {
        Duration::from_millis(self.navigation_ceiling)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay)
    }

    pub fn delivery_retry_delay(&self) -> Duration {
        Duration::from_millis(self.delivery_retry_delay)
    }
}

/// User agent identification for the HTTP agent
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    pub name: String,

    pub version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: Option<String>,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            name: "ShelfSweep".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: None,
        }
    }
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(url) => format!("{}/{} (+{})", self.name, self.version, url),
            None => format!("{}/{}", self.name, self.version),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite result store
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path of the markdown report written by `--export-summary`
    #[serde(rename = "summary-path")]
    pub summary_path: Option<String>,

    /// Default path for `--export-csv`
    #[serde(rename = "csv-path")]
    pub csv_path: Option<String>,
}

/// Override for one entry of the site table
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    pub site: Site,

    /// Search URL with `{query}` and `{page}` placeholders
    #[serde(rename = "search-template")]
    pub search_template: Option<String>,

    /// Host every variant of this family collapses to
    #[serde(rename = "canonical-host")]
    pub canonical_host: Option<String>,

    /// Host patterns belonging to the family (e.g. "*.example.com")
    #[serde(rename = "host-patterns")]
    pub host_patterns: Option<Vec<String>>,

    /// Query parameters that identify a product
    #[serde(rename = "keep-params")]
    pub keep_params: Option<Vec<String>>,
}
