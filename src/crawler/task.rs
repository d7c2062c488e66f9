//! Recursive crawl task
//!
//! A task processes exactly one site-scoped URL: fetch, store the page,
//! index its content, then fork one child task per accepted outbound
//! link and join them all. The per-site semaphore bounds how many tasks
//! run at once; the tokio runtime supplies the work stealing.
//!
//! Cancellation is cooperative: it is checked on entry and again before
//! each fork, and surfaces as [`CrawlError::Cancelled`] so the
//! orchestrator can record a deliberate stop instead of a fault.

use crate::crawler::fetcher::{FetchError, PageFetcher};
use crate::index::{IndexBuilder, IndexError};
use crate::storage::{SqliteStorage, Storage, StorageError};
use crate::url::{normalize_path, split_url};
use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use url::Url;

/// File extensions the crawler never follows
const BLOCKED_EXTENSIONS: &[&str] = &[
    ".pdf", ".doc", ".docx", ".jpg", ".jpeg", ".png", ".zip", ".rar", ".exe", ".tar", ".gz",
];

/// Errors that can abort a crawl tree
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// The shared stop signal was observed; a deliberate stop, not a fault
    #[error("crawl stopped by user")]
    Cancelled,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("crawl task failed: {0}")]
    Task(String),
}

/// Shared state for one site's crawl tree
pub struct CrawlContext {
    /// Row ID of the site being crawled
    pub site_id: i64,

    /// Normalized site origin; links must start here to be followed
    pub site_url: String,

    pub storage: Arc<Mutex<SqliteStorage>>,
    pub fetcher: Arc<PageFetcher>,
    pub index_builder: IndexBuilder,

    /// Shared stop signal, set by the orchestrator
    pub cancel: Arc<AtomicBool>,

    /// Bounds concurrent tasks within this site's tree
    pub permits: Arc<Semaphore>,

    /// Fixed delay before every fetch
    pub politeness_delay: Duration,
}

/// Crawls one URL and recurses into its accepted outbound links
///
/// Returns once the whole subtree rooted at `url` has been processed.
/// The first error anywhere in the subtree fails the tree; pages
/// already persisted stay persisted.
pub fn crawl_page(
    ctx: Arc<CrawlContext>,
    url: String,
) -> Pin<Box<dyn Future<Output = Result<(), CrawlError>> + Send>> {
    Box::pin(async move {
        if ctx.cancel.load(Ordering::SeqCst) {
            return Err(CrawlError::Cancelled);
        }

        let links = {
            // The permit covers the fetch-store-index span only; it must
            // be released before joining children, or a deep tree would
            // deadlock on its own ancestors' permits.
            let _permit = ctx
                .permits
                .acquire()
                .await
                .map_err(|_| CrawlError::Cancelled)?;

            tokio::time::sleep(ctx.politeness_delay).await;

            tracing::debug!("fetching {}", url);
            let fetched = ctx.fetcher.fetch(&url).await?;

            let path = match Url::parse(&url) {
                Ok(parsed) => normalize_path(parsed.path()),
                Err(e) => return Err(CrawlError::Fetch(FetchError::InvalidUrl(e.to_string()))),
            };

            let page = {
                let mut storage = ctx.storage.lock().unwrap();
                storage.touch_site(ctx.site_id)?;

                // Dedup: another task may have stored this path already.
                // The check races with concurrent discovery of the same
                // link; the upsert below is idempotent, so a lost race
                // costs one redundant write, never a duplicate row.
                if storage.find_page(ctx.site_id, &path)?.is_some() {
                    tracing::debug!("page already stored, skipping: {}", path);
                    return Ok(());
                }

                let page_id =
                    storage.upsert_page(ctx.site_id, &path, fetched.status_code, &fetched.content)?;
                storage.get_page(page_id)?
            };

            ctx.index_builder.persist_page_index(&page)?;
            tracing::debug!("indexed page {} ({})", page.path, url);

            fetched.links
        };

        let mut handles = Vec::new();
        let mut seen = HashSet::new();
        for link in links {
            if ctx.cancel.load(Ordering::SeqCst) {
                return Err(CrawlError::Cancelled);
            }

            if accept_link(&link, &ctx.site_url) && seen.insert(link.clone()) {
                handles.push(tokio::spawn(crawl_page(ctx.clone(), link)));
            }
        }

        let mut result = Ok(());
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
                Err(e) => {
                    if result.is_ok() {
                        result = Err(CrawlError::Task(e.to_string()));
                    }
                }
            }
        }

        result
    })
}

/// Decides whether a discovered link belongs to this site's crawl tree
///
/// A link is followed only if its normalized origin matches the site,
/// it carries no fragment, and its path does not end in a blocked file
/// extension.
fn accept_link(link: &str, site_url: &str) -> bool {
    let parsed = match Url::parse(link) {
        Ok(p) => p,
        Err(_) => return false,
    };

    if parsed.fragment().is_some() {
        return false;
    }

    match split_url(link) {
        Ok((origin, _)) if origin == site_url => {}
        _ => return false,
    }

    let path = parsed.path().to_lowercase();
    !BLOCKED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_same_origin_link() {
        assert!(accept_link(
            "https://example.com/news/today",
            "https://example.com"
        ));
    }

    #[test]
    fn test_reject_foreign_origin() {
        assert!(!accept_link("https://other.com/page", "https://example.com"));
    }

    #[test]
    fn test_reject_fragment() {
        assert!(!accept_link(
            "https://example.com/page#section",
            "https://example.com"
        ));
    }

    #[test]
    fn test_reject_blocked_extensions() {
        for ext in BLOCKED_EXTENSIONS {
            let link = format!("https://example.com/file{}", ext);
            assert!(!accept_link(&link, "https://example.com"), "{}", link);
        }
    }

    #[test]
    fn test_blocked_extension_case_insensitive() {
        assert!(!accept_link(
            "https://example.com/REPORT.PDF",
            "https://example.com"
        ));
    }

    #[test]
    fn test_accept_www_variant_of_same_origin() {
        // www. is stripped during normalization, so this is the same site
        assert!(accept_link(
            "https://www.example.com/page",
            "https://example.com"
        ));
    }

    #[test]
    fn test_reject_unparseable() {
        assert!(!accept_link("not a url", "https://example.com"));
    }
}
