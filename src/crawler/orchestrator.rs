//! Crawl orchestrator
//!
//! This module manages the per-site crawl lifecycles: it launches one
//! worker per configured site, each running a recursive crawl tree,
//! tracks the workers so a second start is refused while any is alive,
//! and turns the shared stop signal into FAILED/"stopped by user" site
//! rows. It also hosts single-page reindexing, which bypasses the tree
//! and processes exactly one URL.

use crate::config::Config;
use crate::crawler::fetcher::{build_http_client, FetchError, PageFetcher};
use crate::crawler::task::{crawl_page, CrawlContext, CrawlError};
use crate::index::{IndexBuilder, IndexError};
use crate::lemma::Lemmatizer;
use crate::storage::{SiteStatus, SqliteStorage, Storage, StorageError};
use crate::url::{normalize_base_url, split_url};
use crate::SearchlightError;
use reqwest::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Errors returned by the start/stop operations
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error("indexing is already running")]
    AlreadyRunning,

    #[error("indexing is not running")]
    NotRunning,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors returned by single-page indexing
#[derive(Debug, thiserror::Error)]
pub enum IndexPageError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("page is outside the configured site list: {0}")]
    OutOfScope(String),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Manages crawl workers and the shared stop signal
pub struct CrawlOrchestrator {
    config: Arc<Config>,
    storage: Arc<Mutex<SqliteStorage>>,
    lemmatizer: Arc<Lemmatizer>,
    client: Client,
    cancel: Arc<AtomicBool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl CrawlOrchestrator {
    /// Creates an orchestrator over the given configuration and storage
    pub fn new(
        config: Arc<Config>,
        storage: Arc<Mutex<SqliteStorage>>,
        lemmatizer: Arc<Lemmatizer>,
    ) -> Result<Self, SearchlightError> {
        let client = build_http_client(&config.user_agent)?;

        Ok(Self {
            config,
            storage,
            lemmatizer,
            client,
            cancel: Arc::new(AtomicBool::new(false)),
            workers: Mutex::new(Vec::new()),
        })
    }

    /// Launches one crawl worker per configured site
    ///
    /// Fails with [`OrchestratorError::AlreadyRunning`] while any worker
    /// from a previous start is still alive. Returns as soon as the
    /// workers are spawned; the crawl itself is asynchronous. Each
    /// worker drops the site's previous rows, creates a fresh INDEXING
    /// site, runs the crawl tree, and records INDEXED or FAILED.
    pub fn start_full_crawl(&self) -> Result<(), OrchestratorError> {
        let mut workers = self.workers.lock().unwrap();

        if workers.iter().any(|handle| !handle.is_finished()) {
            tracing::warn!("full crawl requested while one is already running");
            return Err(OrchestratorError::AlreadyRunning);
        }

        tracing::info!("starting full crawl of {} sites", self.config.sites.len());

        self.cancel.store(false, Ordering::SeqCst);
        workers.clear();

        for site in &self.config.sites {
            workers.push(self.spawn_site_worker(site.url.clone(), site.name.clone()));
        }

        Ok(())
    }

    /// Signals every active worker to stop and fails the affected sites
    ///
    /// Fails with [`OrchestratorError::NotRunning`] when no site is
    /// currently INDEXING. Cancellation is cooperative: workers observe
    /// the flag at task boundaries and unwind with a distinguished
    /// cancellation error.
    pub fn stop_crawl(&self) -> Result<(), OrchestratorError> {
        let mut storage = self.storage.lock().unwrap();

        if !storage.site_exists_with_status(SiteStatus::Indexing)? {
            tracing::warn!("stop requested but no crawl is running");
            return Err(OrchestratorError::NotRunning);
        }

        tracing::info!("stopping crawl on user request");
        self.cancel.store(true, Ordering::SeqCst);

        for site in storage.find_sites_by_status(SiteStatus::Indexing)? {
            storage.update_site_status(site.id, SiteStatus::Failed, Some("stopped by user"))?;
            tracing::info!("crawl stopped for site: {}", site.url);
        }

        Ok(())
    }

    /// Fetches and (re)indexes a single page
    ///
    /// The URL must parse and its origin must match a configured site.
    /// Any previous index contribution of the page is unwound before
    /// the fresh fetch is stored and indexed.
    pub async fn index_single_page(&self, url: &str) -> Result<(), IndexPageError> {
        tracing::info!("indexing single page: {}", url);

        let (origin, path) = split_url(url).map_err(|e| IndexPageError::InvalidUrl(e.to_string()))?;

        let site_name = self
            .config
            .sites
            .iter()
            .find(|s| normalize_base_url(&s.url).map_or(false, |u| u == origin))
            .map(|s| s.name.clone())
            .ok_or_else(|| IndexPageError::OutOfScope(url.to_string()))?;

        let index_builder = IndexBuilder::new(self.storage.clone(), self.lemmatizer.clone());

        // Find or create the site, and unwind the old page if present
        let site_id = {
            let mut storage = self.storage.lock().unwrap();
            let site_id = match storage.find_site_by_url(&origin)? {
                Some(site) => site.id,
                None => storage.insert_site(&origin, &site_name, SiteStatus::Indexing)?,
            };

            if let Some(old_page) = storage.find_page(site_id, &path)? {
                tracing::info!("removing previously indexed page: {}", path);
                drop(storage);
                index_builder.remove_page_index(&old_page)?;
                self.storage.lock().unwrap().delete_page(old_page.id)?;
            }

            site_id
        };

        let fetcher = PageFetcher::new(
            self.client.clone(),
            self.config.user_agent.referrer.clone(),
            Duration::from_secs(self.config.crawler.single_page_timeout_secs),
        );

        match fetcher.fetch(url).await {
            Ok(fetched) => {
                let page = {
                    let mut storage = self.storage.lock().unwrap();
                    let page_id =
                        storage.upsert_page(site_id, &path, fetched.status_code, &fetched.content)?;
                    storage.get_page(page_id)?
                };

                index_builder.persist_page_index(&page)?;

                self.storage.lock().unwrap().update_site_status(
                    site_id,
                    SiteStatus::Indexed,
                    None,
                )?;

                tracing::info!("page indexed: {}{}", origin, path);
                Ok(())
            }
            Err(e) => {
                self.storage.lock().unwrap().update_site_status(
                    site_id,
                    SiteStatus::Failed,
                    Some(&e.to_string()),
                )?;

                tracing::error!("failed to fetch {}: {}", url, e);
                Err(IndexPageError::Fetch(e))
            }
        }
    }

    /// Waits until every spawned worker has finished
    ///
    /// Liveness is polled rather than joined so the handles stay usable
    /// for the already-running check in [`start_full_crawl`].
    pub async fn wait_until_idle(&self) {
        loop {
            let busy = self
                .workers
                .lock()
                .unwrap()
                .iter()
                .any(|handle| !handle.is_finished());

            if !busy {
                return;
            }

            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    fn spawn_site_worker(&self, site_url: String, site_name: String) -> JoinHandle<()> {
        let storage = self.storage.clone();
        let cancel = self.cancel.clone();
        let client = self.client.clone();
        let lemmatizer = self.lemmatizer.clone();
        let crawler_config = self.config.crawler.clone();
        let referrer = self.config.user_agent.referrer.clone();

        tokio::spawn(async move {
            let url = match normalize_base_url(&site_url) {
                Ok(url) => url,
                Err(e) => {
                    // Unreachable after config validation, but a worker
                    // must not bring down its siblings
                    tracing::error!("cannot normalize site url {}: {}", site_url, e);
                    return;
                }
            };

            tracing::info!("indexing site: {}", url);

            let site_id = {
                let mut guard = storage.lock().unwrap();
                if let Err(e) = guard.delete_site_by_url(&url) {
                    tracing::error!("cannot clear previous rows for {}: {}", url, e);
                    return;
                }
                match guard.insert_site(&url, &site_name, SiteStatus::Indexing) {
                    Ok(id) => id,
                    Err(e) => {
                        tracing::error!("cannot create site row for {}: {}", url, e);
                        return;
                    }
                }
            };

            let fetcher = PageFetcher::new(
                client,
                referrer,
                Duration::from_secs(crawler_config.fetch_timeout_secs),
            );

            let ctx = Arc::new(CrawlContext {
                site_id,
                site_url: url.clone(),
                storage: storage.clone(),
                fetcher: Arc::new(fetcher),
                index_builder: IndexBuilder::new(storage.clone(), lemmatizer),
                cancel,
                permits: Arc::new(Semaphore::new(crawler_config.max_concurrent_tasks as usize)),
                politeness_delay: Duration::from_millis(crawler_config.politeness_delay_ms),
            });

            let result = crawl_page(ctx, url.clone()).await;

            let mut guard = storage.lock().unwrap();
            let outcome = match result {
                Ok(()) => {
                    tracing::info!("site indexed: {}", url);
                    guard.update_site_status(site_id, SiteStatus::Indexed, None)
                }
                Err(CrawlError::Cancelled) => {
                    tracing::warn!("crawl stopped by user for site: {}", url);
                    guard.update_site_status(site_id, SiteStatus::Failed, Some("stopped by user"))
                }
                Err(e) => {
                    tracing::error!("crawl failed for site {}: {}", url, e);
                    guard.update_site_status(
                        site_id,
                        SiteStatus::Failed,
                        Some(&format!("crawl failed: {}", e)),
                    )
                }
            };

            if let Err(e) = outcome {
                tracing::error!("cannot record crawl outcome for {}: {}", url, e);
            }
        })
    }
}
