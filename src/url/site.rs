use crate::config::{Site, SiteEntry};
use crate::url::matcher::matches_wildcard;
use url::form_urlencoded;

/// Query parameters kept for hosts outside every known family
pub const DEFAULT_KEEP_PARAMS: &[&str] = &["pid", "dp"];

/// Everything the crawler knows about one store family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteProfile {
    pub site: Site,

    /// Search URL with `{query}` and `{page}` placeholders
    pub search_template: String,

    /// Host every regional/mobile variant collapses to
    pub canonical_host: String,

    /// Host patterns belonging to the family
    pub host_patterns: Vec<String>,

    /// Query parameters that identify a product, in output order
    pub keep_params: Vec<String>,
}

impl SiteProfile {
    pub fn flipkart() -> Self {
        Self {
            site: Site::Flipkart,
            search_template: "https://www.flipkart.com/search?q={query}&page={page}".to_string(),
            canonical_host: "www.flipkart.com".to_string(),
            host_patterns: vec!["*.flipkart.com".to_string()],
            keep_params: vec!["pid".to_string()],
        }
    }

    pub fn amazon() -> Self {
        Self {
            site: Site::Amazon,
            search_template: "https://www.amazon.in/s?k={query}&page={page}".to_string(),
            canonical_host: "www.amazon.in".to_string(),
            host_patterns: vec![
                "*.amazon.in".to_string(),
                "*.amazon.com".to_string(),
                "*.amazon.co.uk".to_string(),
            ],
            keep_params: vec!["dp".to_string()],
        }
    }

    /// Returns true if `host` belongs to this family
    pub fn owns_host(&self, host: &str) -> bool {
        host == self.canonical_host
            || self
                .host_patterns
                .iter()
                .any(|pattern| matches_wildcard(pattern, host))
    }

    /// Builds the listing URL for one search result page
    ///
    /// The query is trimmed and form-encoded; the function is pure.
    pub fn search_url(&self, query: &str, page: u32) -> String {
        let encoded: String = form_urlencoded::byte_serialize(query.trim().as_bytes()).collect();
        self.search_template
            .replace("{query}", &encoded)
            .replace("{page}", &page.to_string())
    }

    fn apply(&mut self, entry: &SiteEntry) {
        if let Some(template) = &entry.search_template {
            self.search_template = template.clone();
        }
        if let Some(host) = &entry.canonical_host {
            self.canonical_host = host.to_lowercase();
        }
        if let Some(patterns) = &entry.host_patterns {
            self.host_patterns = patterns.iter().map(|p| p.to_lowercase()).collect();
        }
        if let Some(params) = &entry.keep_params {
            self.keep_params = params.clone();
        }
    }
}

/// Lookup table of site profiles, used both for search URLs and for
/// hostname canonicalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteTable {
    profiles: Vec<SiteProfile>,
}

impl Default for SiteTable {
    fn default() -> Self {
        Self {
            profiles: vec![SiteProfile::flipkart(), SiteProfile::amazon()],
        }
    }
}

impl SiteTable {
    pub fn new(profiles: Vec<SiteProfile>) -> Self {
        Self { profiles }
    }

    /// Builds the default table with settings-file overrides applied
    pub fn with_overrides(entries: &[SiteEntry]) -> Self {
        let mut table = Self::default();
        for entry in entries {
            if let Some(profile) = table.profiles.iter_mut().find(|p| p.site == entry.site) {
                profile.apply(entry);
            }
        }
        table
    }

    pub fn profile(&self, site: Site) -> Option<&SiteProfile> {
        self.profiles.iter().find(|p| p.site == site)
    }

    /// Finds the family a (lowercase) host belongs to
    pub fn family_for_host(&self, host: &str) -> Option<&SiteProfile> {
        self.profiles.iter().find(|p| p.owns_host(host))
    }

    /// Builds the listing URL for `site`, or None if the site has no profile
    pub fn search_url(&self, site: Site, query: &str, page: u32) -> Option<String> {
        self.profile(site).map(|p| p.search_url(query, page))
    }
}
