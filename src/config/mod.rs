//! Configuration module for Shelf-Sweep
//!
//! Two kinds of configuration live here: the per-session [`CrawlConfig`]
//! (site, query and page range) validated on every `start`, and the
//! [`Settings`] file that the command-line front-end loads from TOML.
//!
//! # Example
//!
//! ```no_run
//! use shelf_sweep::config::load_settings;
//! use std::path::Path;
//!
//! let settings = load_settings(Path::new("shelf-sweep.toml")).unwrap();
//! println!("Results go to {}", settings.output.database_path);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    CrawlConfig, OutputConfig, Settings, Site, SiteEntry, Timing, UserAgentConfig,
};

pub use parser::{compute_config_hash, load_settings, load_settings_with_hash, parse_settings};
pub use validation::{validate_crawl_config, MAX_END_PAGE, MIN_QUERY_LEN};
