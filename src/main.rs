//! Searchlight main entry point
//!
//! This is the command-line interface for the Searchlight site-list
//! search engine.

use anyhow::Context;
use clap::{Parser, Subcommand};
use searchlight::config::load_config_with_hash;
use searchlight::crawler::CrawlOrchestrator;
use searchlight::search::SearchEngine;
use searchlight::stats::{load_statistics, print_statistics};
use searchlight::storage::SqliteStorage;
use searchlight::Lemmatizer;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing_subscriber::EnvFilter;

/// Searchlight: a site-list crawler and ranked search engine
///
/// Searchlight crawls a configured list of sites, builds a per-site
/// index of morphologically normalized words, and answers ranked
/// full-text queries against that index.
#[derive(Parser, Debug)]
#[command(name = "searchlight")]
#[command(version = "1.0.0")]
#[command(about = "A site-list crawler and ranked search engine", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl every configured site and rebuild its index
    Crawl,

    /// Fetch and (re)index a single page of a configured site
    IndexPage {
        /// Full URL of the page
        url: String,
    },

    /// Run a ranked query against the index
    Search {
        /// Query text
        query: String,

        /// Restrict the search to one configured site URL
        #[arg(long)]
        site: Option<String>,

        /// Number of leading results to skip
        #[arg(long, default_value_t = 0)]
        offset: usize,

        /// Maximum number of results to return
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Show index statistics per configured site
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let storage = SqliteStorage::new(Path::new(&config.output.database_path))
        .context("failed to open database")?;
    let storage = Arc::new(Mutex::new(storage));
    let lemmatizer = Arc::new(Lemmatizer::new());
    let config = Arc::new(config);

    match cli.command {
        Command::Crawl => handle_crawl(config, storage, lemmatizer).await,
        Command::IndexPage { url } => handle_index_page(config, storage, lemmatizer, &url).await,
        Command::Search {
            query,
            site,
            offset,
            limit,
        } => handle_search(config, storage, lemmatizer, &query, site.as_deref(), offset, limit),
        Command::Stats => handle_stats(config, storage),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("searchlight=info,warn"),
            1 => EnvFilter::new("searchlight=debug,info"),
            2 => EnvFilter::new("searchlight=trace,debug"),
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

/// Handles the crawl subcommand: full crawl of every configured site
///
/// Ctrl-C during the crawl triggers a cooperative stop; the command
/// then waits for the workers to unwind before exiting.
async fn handle_crawl(
    config: Arc<searchlight::config::Config>,
    storage: Arc<Mutex<SqliteStorage>>,
    lemmatizer: Arc<Lemmatizer>,
) -> anyhow::Result<()> {
    let orchestrator = CrawlOrchestrator::new(config, storage, lemmatizer)?;

    orchestrator.start_full_crawl()?;
    println!("Crawl started; press Ctrl-C to stop");

    tokio::select! {
        _ = orchestrator.wait_until_idle() => {
            println!("Crawl finished");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, stopping crawl");
            // The crawl may have finished between the signal and here
            if let Err(e) = orchestrator.stop_crawl() {
                tracing::warn!("stop request: {}", e);
            }
            orchestrator.wait_until_idle().await;
            println!("Crawl stopped");
        }
    }

    Ok(())
}

/// Handles the index-page subcommand
async fn handle_index_page(
    config: Arc<searchlight::config::Config>,
    storage: Arc<Mutex<SqliteStorage>>,
    lemmatizer: Arc<Lemmatizer>,
    url: &str,
) -> anyhow::Result<()> {
    let orchestrator = CrawlOrchestrator::new(config, storage, lemmatizer)?;

    orchestrator.index_single_page(url).await?;
    println!("Page indexed: {}", url);

    Ok(())
}

/// Handles the search subcommand
fn handle_search(
    config: Arc<searchlight::config::Config>,
    storage: Arc<Mutex<SqliteStorage>>,
    lemmatizer: Arc<Lemmatizer>,
    query: &str,
    site: Option<&str>,
    offset: usize,
    limit: usize,
) -> anyhow::Result<()> {
    let engine = SearchEngine::new(storage, lemmatizer, config.sites.clone());

    let outcome = engine.search(query, site, offset, limit)?;

    println!(
        "Found {} results (showing {})\n",
        outcome.total,
        outcome.results.len()
    );

    for result in &outcome.results {
        println!("{:.3}  {}{}", result.relevance, result.site, result.uri);
        if !result.title.is_empty() {
            println!("       {}", result.title);
        }
        println!("       {}\n", result.snippet);
    }

    Ok(())
}

/// Handles the stats subcommand
fn handle_stats(
    config: Arc<searchlight::config::Config>,
    storage: Arc<Mutex<SqliteStorage>>,
) -> anyhow::Result<()> {
    let guard = storage.lock().unwrap();
    let report = load_statistics(&*guard, &config.sites)?;
    print_statistics(&report);

    Ok(())
}
