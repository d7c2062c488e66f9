//! Storage module for the crawl index
//!
//! This module handles all database operations for the engine, including:
//! - SQLite database initialization and schema management
//! - Site lifecycle rows and the crawl status state machine
//! - Page upserts keyed by (site, path)
//! - Lemma rows with atomic frequency arithmetic
//! - Batched index entry writes and the aggregate queries search needs

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::SearchlightError;
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(SearchlightError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SearchlightError> {
    SqliteStorage::new(path)
}

/// Represents a configured site in the database
#[derive(Debug, Clone)]
pub struct SiteRecord {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub status: SiteStatus,
    pub status_time: String,
    pub last_error: Option<String>,
}

/// Represents a fetched page of a site
#[derive(Debug, Clone)]
pub struct PageRecord {
    pub id: i64,
    pub site_id: i64,
    pub path: String,
    pub code: u16,
    pub content: String,
}

/// Represents a lemma row scoped to a site
///
/// `frequency` counts the pages of the site that contain this lemma at
/// least once, not the total number of occurrences.
#[derive(Debug, Clone)]
pub struct LemmaRecord {
    pub id: i64,
    pub site_id: i64,
    pub lemma: String,
    pub frequency: i64,
}

/// One row of the sparse page-by-lemma matrix, staged for a batch insert
///
/// `rank` is the raw occurrence count of the lemma within the page.
#[derive(Debug, Clone, Copy)]
pub struct IndexEntry {
    pub page_id: i64,
    pub lemma_id: i64,
    pub rank: f64,
}

/// Crawl status of a site
///
/// INDEXING is the only non-terminal state; INDEXED and FAILED persist
/// until the next full crawl or single-page reindex restarts the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SiteStatus {
    Indexing,
    Indexed,
    Failed,
}

impl SiteStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Indexing => "INDEXING",
            Self::Indexed => "INDEXED",
            Self::Failed => "FAILED",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "INDEXING" => Some(Self::Indexing),
            "INDEXED" => Some(Self::Indexed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.to_db_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_status_roundtrip() {
        for status in &[SiteStatus::Indexing, SiteStatus::Indexed, SiteStatus::Failed] {
            let db_str = status.to_db_string();
            let parsed = SiteStatus::from_db_string(db_str);
            assert_eq!(Some(*status), parsed);
        }
    }

    #[test]
    fn test_site_status_invalid() {
        assert_eq!(SiteStatus::from_db_string("UNKNOWN"), None);
    }
}
