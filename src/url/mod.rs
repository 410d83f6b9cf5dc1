//! URL handling module for Shelf-Sweep
//!
//! This module provides the deduplication key function, host pattern
//! matching, and the per-site table of search templates and hostname
//! canonicalization rules.

mod host;
mod matcher;
mod normalize;
mod site;

pub use host::{extract_host, host_of};
pub use matcher::matches_wildcard;
pub use normalize::normalize;
pub use site::{SiteProfile, SiteTable, DEFAULT_KEEP_PARAMS};
