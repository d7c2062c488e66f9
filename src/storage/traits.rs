//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::storage::{IndexEntry, LemmaRecord, PageRecord, SiteRecord, SiteStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Page not found: {0}")]
    PageNotFound(i64),

    #[error("Site not found: {0}")]
    SiteNotFound(String),

    #[error("Consistency error: {0}")]
    Consistency(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines the database operations the crawler, indexer, and
/// search engine need. Implementations should guarantee the uniqueness
/// constraints on (site, path) and (site, lemma), cascade site deletion
/// to pages, lemmas, and index entries, and perform lemma frequency
/// arithmetic atomically.
pub trait Storage {
    // ===== Site Management =====

    /// Deletes the site stored under a normalized URL, if present
    ///
    /// Deletion cascades to the site's pages, lemmas, and index entries.
    fn delete_site_by_url(&mut self, url: &str) -> StorageResult<()>;

    /// Inserts a new site row with the given status and a fresh status time
    ///
    /// # Returns
    ///
    /// The ID of the newly created site
    fn insert_site(&mut self, url: &str, name: &str, status: SiteStatus) -> StorageResult<i64>;

    /// Gets a site by its normalized URL
    fn find_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>>;

    /// Updates a site's status, last error, and status time
    fn update_site_status(
        &mut self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()>;

    /// Refreshes a site's status time without changing its status
    fn touch_site(&mut self, site_id: i64) -> StorageResult<()>;

    /// Checks whether any site currently has the given status
    fn site_exists_with_status(&self, status: SiteStatus) -> StorageResult<bool>;

    /// Gets all sites with the given status
    fn find_sites_by_status(&self, status: SiteStatus) -> StorageResult<Vec<SiteRecord>>;

    /// Counts all sites
    fn count_sites(&self) -> StorageResult<u64>;

    // ===== Page Management =====

    /// Gets a page by (site, normalized path)
    fn find_page(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>>;

    /// Gets a page by ID
    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord>;

    /// Inserts a page or replaces the stored code/content on conflict
    ///
    /// # Returns
    ///
    /// The page ID (either newly created or existing)
    fn upsert_page(
        &mut self,
        site_id: i64,
        path: &str,
        code: u16,
        content: &str,
    ) -> StorageResult<i64>;

    /// Deletes a page; its index entries go with it
    fn delete_page(&mut self, page_id: i64) -> StorageResult<()>;

    /// Counts the pages of one site
    fn count_pages_by_site(&self, site_id: i64) -> StorageResult<u64>;

    /// Counts all pages across all sites
    fn count_total_pages(&self) -> StorageResult<u64>;

    // ===== Lemma Management =====

    /// Inserts a lemma with frequency 1, or atomically increments the
    /// frequency of the existing (site, lemma) row by 1
    fn upsert_lemma(&mut self, site_id: i64, lemma: &str) -> StorageResult<()>;

    /// Gets a lemma row by (site, text)
    fn find_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>>;

    /// Atomically decrements the frequency of a (site, lemma) row by 1
    fn decrement_lemma_frequency(&mut self, site_id: i64, lemma: &str) -> StorageResult<()>;

    /// Counts the lemmas of one site
    fn count_lemmas_by_site(&self, site_id: i64) -> StorageResult<u64>;

    /// Counts all lemmas across all sites
    fn count_total_lemmas(&self) -> StorageResult<u64>;

    /// Returns MAX(lemma frequency) / page count for one site
    ///
    /// None when the site has no lemmas or no pages. The search engine
    /// derives its commonness ceiling from this value.
    fn max_lemma_frequency_fraction(&self, site_id: i64) -> StorageResult<Option<f64>>;

    /// Returns the fraction of ALL indexed pages that contain this lemma
    ///
    /// Distinct pages referencing the lemma divided by the total page
    /// count of the entire index, 0.0 when the index is empty.
    fn lemma_page_fraction(&self, lemma_id: i64) -> StorageResult<f64>;

    // ===== Index Entry Management =====

    /// Inserts a batch of index entries as one atomic unit
    fn insert_index_entries(&mut self, entries: &[IndexEntry]) -> StorageResult<()>;

    /// Bulk-deletes all index entries referencing a page
    fn delete_index_entries_by_page(&mut self, page_id: i64) -> StorageResult<()>;

    /// Gets the IDs of all pages containing a lemma
    fn pages_with_lemma(&self, lemma_id: i64) -> StorageResult<Vec<i64>>;

    /// Sums the ranks of every index entry of a page (absolute relevance)
    fn page_rank_sum(&self, page_id: i64) -> StorageResult<f64>;
}
