use crate::config::types::{
    CrawlConfig, OutputConfig, Settings, SiteEntry, Timing, UserAgentConfig,
};
use crate::{ConfigError, CrawlError};
use std::collections::HashSet;
use url::Url;

/// Highest listing page a session may reach
pub const MAX_END_PAGE: u32 = 50;

/// Minimum trimmed length of a search query
pub const MIN_QUERY_LEN: usize = 2;

/// Validates the parameters of a crawl session
///
/// Runs before any session state is touched; a failure means the session
/// never starts.
pub fn validate_crawl_config(config: &CrawlConfig) -> Result<(), CrawlError> {
    if config.query.trim().chars().count() < MIN_QUERY_LEN {
        return Err(CrawlError::Validation(format!(
            "search query must be at least {} characters",
            MIN_QUERY_LEN
        )));
    }

    if config.start_page < 1 {
        return Err(CrawlError::Validation(format!(
            "start page must be >= 1, got {}",
            config.start_page
        )));
    }

    if config.end_page < config.start_page {
        return Err(CrawlError::Validation(format!(
            "end page ({}) must not be before start page ({})",
            config.end_page, config.start_page
        )));
    }

    if config.end_page > MAX_END_PAGE {
        return Err(CrawlError::Validation(format!(
            "end page must be <= {}, got {}",
            MAX_END_PAGE, config.end_page
        )));
    }

    Ok(())
}

/// Validates the entire settings file
pub fn validate(settings: &Settings) -> Result<(), ConfigError> {
    validate_timing(&settings.timing)?;
    validate_user_agent_config(&settings.user_agent)?;
    validate_output_config(&settings.output)?;
    validate_site_entries(&settings.sites)?;
    Ok(())
}

fn validate_timing(timing: &Timing) -> Result<(), ConfigError> {
    let budgets = [
        ("page-timeout", timing.page_timeout),
        ("product-timeout", timing.product_timeout),
        ("poll-interval", timing.poll_interval),
        ("navigation-ceiling", timing.navigation_ceiling),
    ];
    for (name, value) in budgets {
        if value == 0 {
            return Err(ConfigError::Validation(format!(
                "{} must be greater than zero",
                name
            )));
        }
    }

    if timing.poll_interval > timing.navigation_ceiling {
        return Err(ConfigError::Validation(format!(
            "poll-interval ({}ms) cannot exceed navigation-ceiling ({}ms)",
            timing.poll_interval, timing.navigation_ceiling
        )));
    }

    if timing.max_urls_per_session < 1 {
        return Err(ConfigError::Validation(
            "max-urls-per-session must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.name.is_empty() {
        return Err(ConfigError::Validation(
            "user agent name cannot be empty".to_string(),
        ));
    }

    if !config.name.chars().all(|c| c.is_alphanumeric() || c == '-') {
        return Err(ConfigError::Validation(format!(
            "user agent name must contain only alphanumeric characters and hyphens, got '{}'",
            config.name
        )));
    }

    if let Some(contact_url) = &config.contact_url {
        Url::parse(contact_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if matches!(&config.summary_path, Some(p) if p.is_empty()) {
        return Err(ConfigError::Validation(
            "summary-path cannot be empty".to_string(),
        ));
    }

    if matches!(&config.csv_path, Some(p) if p.is_empty()) {
        return Err(ConfigError::Validation(
            "csv-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates site table overrides
fn validate_site_entries(entries: &[SiteEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in entries {
        if !seen.insert(entry.site) {
            return Err(ConfigError::Validation(format!(
                "site '{}' is configured more than once",
                entry.site
            )));
        }

        if let Some(template) = &entry.search_template {
            validate_search_template(template)?;
        }

        if let Some(host) = &entry.canonical_host {
            validate_host(host)?;
        }

        if let Some(patterns) = &entry.host_patterns {
            if patterns.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "site '{}' must list at least one host pattern",
                    entry.site
                )));
            }
            for pattern in patterns {
                validate_host_pattern(pattern)?;
            }
        }

        if let Some(params) = &entry.keep_params {
            if params.iter().any(|p| p.trim().is_empty()) {
                return Err(ConfigError::Validation(format!(
                    "site '{}' has an empty keep-params entry",
                    entry.site
                )));
            }
        }
    }

    Ok(())
}

/// Validates a search URL template
fn validate_search_template(template: &str) -> Result<(), ConfigError> {
    for placeholder in ["{query}", "{page}"] {
        if !template.contains(placeholder) {
            return Err(ConfigError::Validation(format!(
                "search-template '{}' is missing the {} placeholder",
                template, placeholder
            )));
        }
    }

    let sample = template.replace("{query}", "q").replace("{page}", "1");
    let url = Url::parse(&sample).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid search-template '{}': {}", template, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "search-template '{}' must use http or https",
            template
        )));
    }

    Ok(())
}

/// Validates a host pattern (supports a leading "*." wildcard)
fn validate_host_pattern(pattern: &str) -> Result<(), ConfigError> {
    if pattern.is_empty() {
        return Err(ConfigError::InvalidPattern(
            "Host pattern cannot be empty".to_string(),
        ));
    }

    match pattern.strip_prefix("*.") {
        Some(base) => validate_host(base),
        None => validate_host(pattern),
    }
}

/// Validates a host name (without wildcard prefix)
fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::InvalidPattern("Host cannot be empty".to_string()));
    }

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' contains invalid characters",
            host
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.starts_with('-') || host.ends_with('-')
    {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' cannot start or end with '.' or '-'",
            host
        )));
    }

    if host.contains("..") {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' cannot contain consecutive dots",
            host
        )));
    }

    if !host.contains('.') {
        return Err(ConfigError::InvalidPattern(format!(
            "Host '{}' must contain at least one dot (e.g., 'example.com')",
            host
        )));
    }

    Ok(())
}
