//! Indexing pipeline
//!
//! This module turns stored page content into lemma and rank rows: for
//! every distinct lemma on a page the site-scoped lemma row is upserted
//! (frequency +1, once per page), and one index entry records the
//! lemma's in-page occurrence count as its rank. Removal runs the same
//! pipeline backwards from the page's stored content.

use crate::lemma::Lemmatizer;
use crate::storage::{IndexEntry, PageRecord, SqliteStorage, Storage, StorageError};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Index entries buffered between storage flushes
pub const INDEX_BATCH_SIZE: usize = 5000;

/// Errors raised by the indexing pipeline
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A row expected to exist right after an upsert was missing; fatal
    /// to the current page only
    #[error("lemma missing after upsert: {0}")]
    Consistency(String),
}

/// Persists and removes the per-page lemma index
///
/// Cheap to clone; crawl tasks share one per site.
#[derive(Clone)]
pub struct IndexBuilder {
    storage: Arc<Mutex<SqliteStorage>>,
    lemmatizer: Arc<Lemmatizer>,
}

impl IndexBuilder {
    pub fn new(storage: Arc<Mutex<SqliteStorage>>, lemmatizer: Arc<Lemmatizer>) -> Self {
        Self {
            storage,
            lemmatizer,
        }
    }

    /// Computes lemma counts for a page and persists lemma + index rows
    ///
    /// Writes are buffered and flushed every [`INDEX_BATCH_SIZE`]
    /// entries to bound memory on very large pages; each flush is one
    /// atomic storage batch.
    pub fn persist_page_index(&self, page: &PageRecord) -> Result<(), IndexError> {
        let counts = self.lemmatizer.collect_lemma_counts(&page.content);

        let mut storage = self.storage.lock().unwrap();
        let mut buffer: Vec<IndexEntry> = Vec::new();

        for (lemma, count) in counts {
            storage.upsert_lemma(page.site_id, &lemma)?;

            let record = storage
                .find_lemma(page.site_id, &lemma)?
                .ok_or_else(|| IndexError::Consistency(lemma.clone()))?;

            buffer.push(IndexEntry {
                page_id: page.id,
                lemma_id: record.id,
                rank: count as f64,
            });

            if buffer.len() >= INDEX_BATCH_SIZE {
                storage.insert_index_entries(&buffer)?;
                buffer.clear();
            }
        }

        if !buffer.is_empty() {
            storage.insert_index_entries(&buffer)?;
        }

        tracing::debug!("indexed page id={} path={}", page.id, page.path);
        Ok(())
    }

    /// Unwinds a page's contribution to the index
    ///
    /// The distinct lemma set is recovered by re-lemmatizing the stored
    /// content, not by reading the index table, so the decrements mirror
    /// exactly the increments persist applied for this page.
    pub fn remove_page_index(&self, page: &PageRecord) -> Result<(), IndexError> {
        let lemmas = self.lemmatizer.lemma_set(&page.content);

        let mut storage = self.storage.lock().unwrap();
        for lemma in &lemmas {
            storage.decrement_lemma_frequency(page.site_id, lemma)?;
        }
        storage.delete_index_entries_by_page(page.id)?;

        tracing::debug!(
            "removed index for page id={} ({} lemmas)",
            page.id,
            lemmas.len()
        );
        Ok(())
    }
}
