//! Shelf-Sweep main entry point
//!
//! This is the command-line interface for the Shelf-Sweep product crawler.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use shelf_sweep::agent::HttpAgent;
use shelf_sweep::config::{load_settings_with_hash, Settings, Site};
use shelf_sweep::extractor::HtmlExtractor;
use shelf_sweep::notify::LogNotifier;
use shelf_sweep::output::{print_summary, CsvExport, MarkdownReport, ReportWriter};
use shelf_sweep::storage::{open_store, ResultStore};
use shelf_sweep::{CrawlConfig, Orchestrator, SiteTable};
use tracing_subscriber::EnvFilter;

/// Default report path when the settings file names none
const DEFAULT_SUMMARY_PATH: &str = "shelf-sweep-summary.md";

/// Shelf-Sweep: a two-phase product crawler
///
/// Walks a range of store search result pages collecting product URLs,
/// then visits every product page and extracts a structured record.
#[derive(Parser, Debug)]
#[command(name = "shelf-sweep")]
#[command(version = "1.0.0")]
#[command(about = "A two-phase product crawler", long_about = None)]
struct Cli {
    /// Path to TOML settings file
    #[arg(value_name = "SETTINGS")]
    settings: PathBuf,

    /// Store to crawl (flipkart or amazon)
    #[arg(long)]
    site: Option<Site>,

    /// Search query
    #[arg(long)]
    query: Option<String>,

    /// First search result page
    #[arg(long, default_value_t = 1)]
    start: u32,

    /// Last search result page
    #[arg(long, default_value_t = 1)]
    end: u32,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show the latest stored result and exit
    #[arg(long, conflicts_with_all = ["export_summary", "export_csv", "clear"])]
    stats: bool,

    /// Write a markdown report of the latest stored result and exit
    #[arg(long, conflicts_with_all = ["stats", "export_csv", "clear"])]
    export_summary: bool,

    /// Write the latest stored products as CSV and exit
    #[arg(long, value_name = "PATH", num_args = 0..=1, default_missing_value = "")]
    export_csv: Option<String>,

    /// Delete every stored result and exit
    #[arg(long, conflicts_with_all = ["stats", "export_summary", "export_csv"])]
    clear: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading settings from: {}", cli.settings.display());
    let (settings, hash) = load_settings_with_hash(&cli.settings)
        .with_context(|| format!("Failed to load settings from {}", cli.settings.display()))?;
    tracing::info!("Settings loaded successfully (hash: {})", hash);

    if cli.stats {
        handle_stats(&settings)
    } else if cli.export_summary {
        handle_export_summary(&settings)
    } else if let Some(path) = &cli.export_csv {
        handle_export_csv(&settings, path)
    } else if cli.clear {
        handle_clear(&settings)
    } else {
        let (Some(site), Some(query)) = (cli.site, cli.query.clone()) else {
            bail!("--site and --query are required to start a crawl");
        };
        handle_crawl(settings, CrawlConfig::new(site, query, cli.start, cli.end)).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shelf_sweep=info,warn"),
            1 => EnvFilter::new("shelf_sweep=debug,info"),
            2 => EnvFilter::new("shelf_sweep=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn open_database(settings: &Settings) -> anyhow::Result<shelf_sweep::storage::SqliteResultStore> {
    println!("Database: {}\n", settings.output.database_path);
    open_store(Path::new(&settings.output.database_path))
        .with_context(|| format!("Failed to open {}", settings.output.database_path))
}

/// Handles the --stats mode: prints the latest stored result
fn handle_stats(settings: &Settings) -> anyhow::Result<()> {
    let store = open_database(settings)?;

    let keys = store.list_keys()?;
    println!("Stored results: {}", keys.len());
    for key in &keys {
        println!("  - {}", key);
    }
    println!();

    match store.latest()? {
        Some(result) => print_summary(&result),
        None => println!("No results stored yet"),
    }
    Ok(())
}

/// Handles the --export-summary mode: writes a markdown report
fn handle_export_summary(settings: &Settings) -> anyhow::Result<()> {
    let store = open_database(settings)?;
    let Some(result) = store.latest()? else {
        bail!("No results stored yet");
    };

    let path = settings
        .output
        .summary_path
        .as_deref()
        .unwrap_or(DEFAULT_SUMMARY_PATH);
    MarkdownReport.write_to_path(&result, Path::new(path))?;

    println!("✓ Summary exported to: {}", path);
    Ok(())
}

/// Handles the --export-csv mode: writes the latest products as CSV
fn handle_export_csv(settings: &Settings, path: &str) -> anyhow::Result<()> {
    let path = match (path.is_empty(), settings.output.csv_path.as_deref()) {
        (false, _) => path,
        (true, Some(configured)) => configured,
        (true, None) => bail!("No CSV path given and none configured"),
    };

    let store = open_database(settings)?;
    let Some(result) = store.latest()? else {
        bail!("No results stored yet");
    };

    CsvExport.write_to_path(&result, Path::new(path))?;
    println!(
        "✓ {} products exported to: {}",
        result.products.len(),
        path
    );
    Ok(())
}

/// Handles the --clear mode
fn handle_clear(settings: &Settings) -> anyhow::Result<()> {
    let mut store = open_database(settings)?;
    let removed = store.clear()?;
    println!("✓ Removed {} stored results", removed);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(settings: Settings, config: CrawlConfig) -> anyhow::Result<()> {
    let table = SiteTable::with_overrides(&settings.sites);
    let agent = HttpAgent::new(&settings.user_agent).context("Failed to build HTTP client")?;
    let extractor = HtmlExtractor::new(agent.surface(), table.clone());
    let store = open_store(Path::new(&settings.output.database_path))?;

    let orchestrator = Orchestrator::builder(Arc::new(agent), Arc::new(extractor), Box::new(store))
        .site_table(table)
        .timing(settings.timing.clone())
        .notifier(Arc::new(LogNotifier))
        .build();

    orchestrator.start(config)?;

    tokio::select! {
        _ = orchestrator.wait() => {}
        interrupted = tokio::signal::ctrl_c() => {
            interrupted.context("Failed to listen for interrupt")?;
            tracing::info!("Interrupt received, stopping");
            orchestrator.stop();
        }
    }

    match orchestrator.latest_result()? {
        Some(result) => print_summary(&result),
        None => tracing::warn!("Session ended without a stored result"),
    }

    if let Some(path) = settings.output.summary_path.as_deref() {
        if let Some(result) = orchestrator.latest_result()? {
            MarkdownReport.write_to_path(&result, Path::new(path))?;
            tracing::info!("Summary written to {}", path);
        }
    }

    Ok(())
}
