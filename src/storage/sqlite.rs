//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{IndexEntry, LemmaRecord, PageRecord, SiteRecord, SiteStatus};
use crate::SearchlightError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SearchlightError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SearchlightError> {
        let conn = Connection::open(path)?;

        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        // Initialize schema
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, SearchlightError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn read_site_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SiteRecord> {
        Ok(SiteRecord {
            id: row.get(0)?,
            url: row.get(1)?,
            name: row.get(2)?,
            status: SiteStatus::from_db_string(&row.get::<_, String>(3)?)
                .unwrap_or(SiteStatus::Failed),
            status_time: row.get(4)?,
            last_error: row.get(5)?,
        })
    }

    fn read_page_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<PageRecord> {
        Ok(PageRecord {
            id: row.get(0)?,
            site_id: row.get(1)?,
            path: row.get(2)?,
            code: row.get(3)?,
            content: row.get(4)?,
        })
    }
}

impl Storage for SqliteStorage {
    // ===== Site Management =====

    fn delete_site_by_url(&mut self, url: &str) -> StorageResult<()> {
        // ON DELETE CASCADE drops the site's pages, lemmas, and entries
        self.conn
            .execute("DELETE FROM sites WHERE url = ?1", params![url])?;
        Ok(())
    }

    fn insert_site(&mut self, url: &str, name: &str, status: SiteStatus) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO sites (url, name, status, status_time) VALUES (?1, ?2, ?3, ?4)",
            params![url, name, status.to_db_string(), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn find_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, url, name, status, status_time, last_error FROM sites WHERE url = ?1",
        )?;

        let site = stmt
            .query_row(params![url], Self::read_site_row)
            .optional()?;

        Ok(site)
    }

    fn update_site_status(
        &mut self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE sites SET status = ?1, status_time = ?2, last_error = ?3 WHERE id = ?4",
            params![status.to_db_string(), now, last_error, site_id],
        )?;
        Ok(())
    }

    fn touch_site(&mut self, site_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE sites SET status_time = ?1 WHERE id = ?2",
            params![now, site_id],
        )?;
        Ok(())
    }

    fn site_exists_with_status(&self, status: SiteStatus) -> StorageResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sites WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn find_sites_by_status(&self, status: SiteStatus) -> StorageResult<Vec<SiteRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, url, name, status, status_time, last_error FROM sites WHERE status = ?1",
        )?;

        let sites = stmt
            .query_map(params![status.to_db_string()], Self::read_site_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sites)
    }

    fn count_sites(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM sites", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Page Management =====

    fn find_page(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, site_id, path, code, content FROM pages WHERE site_id = ?1 AND path = ?2",
        )?;

        let page = stmt
            .query_row(params![site_id, path], Self::read_page_row)
            .optional()?;

        Ok(page)
    }

    fn get_page(&self, page_id: i64) -> StorageResult<PageRecord> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, site_id, path, code, content FROM pages WHERE id = ?1")?;

        let page = stmt
            .query_row(params![page_id], Self::read_page_row)
            .map_err(|_| StorageError::PageNotFound(page_id))?;

        Ok(page)
    }

    fn upsert_page(
        &mut self,
        site_id: i64,
        path: &str,
        code: u16,
        content: &str,
    ) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO pages (site_id, path, code, content) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(site_id, path) DO UPDATE SET code = excluded.code, content = excluded.content",
            params![site_id, path, code, content],
        )?;

        // last_insert_rowid is unreliable after a conflict-update, so read
        // the id back under the uniqueness key
        let id: i64 = self.conn.query_row(
            "SELECT id FROM pages WHERE site_id = ?1 AND path = ?2",
            params![site_id, path],
            |row| row.get(0),
        )?;

        Ok(id)
    }

    fn delete_page(&mut self, page_id: i64) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM pages WHERE id = ?1", params![page_id])?;
        Ok(())
    }

    fn count_pages_by_site(&self, site_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM pages WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_total_pages(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Lemma Management =====

    fn upsert_lemma(&mut self, site_id: i64, lemma: &str) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO lemmas (site_id, lemma, frequency) VALUES (?1, ?2, 1)
             ON CONFLICT(site_id, lemma) DO UPDATE SET frequency = frequency + 1",
            params![site_id, lemma],
        )?;
        Ok(())
    }

    fn find_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, site_id, lemma, frequency FROM lemmas WHERE site_id = ?1 AND lemma = ?2",
        )?;

        let record = stmt
            .query_row(params![site_id, lemma], |row| {
                Ok(LemmaRecord {
                    id: row.get(0)?,
                    site_id: row.get(1)?,
                    lemma: row.get(2)?,
                    frequency: row.get(3)?,
                })
            })
            .optional()?;

        Ok(record)
    }

    fn decrement_lemma_frequency(&mut self, site_id: i64, lemma: &str) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE lemmas SET frequency = frequency - 1 WHERE site_id = ?1 AND lemma = ?2",
            params![site_id, lemma],
        )?;
        Ok(())
    }

    fn count_lemmas_by_site(&self, site_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM lemmas WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_total_lemmas(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM lemmas", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn max_lemma_frequency_fraction(&self, site_id: i64) -> StorageResult<Option<f64>> {
        // NULL when the site has no lemmas or no pages (division by zero)
        let fraction: Option<f64> = self.conn.query_row(
            "SELECT MAX(frequency) * 1.0 / (SELECT COUNT(*) FROM pages WHERE site_id = ?1)
             FROM lemmas WHERE site_id = ?1",
            params![site_id],
            |row| row.get(0),
        )?;
        Ok(fraction)
    }

    fn lemma_page_fraction(&self, lemma_id: i64) -> StorageResult<f64> {
        let fraction: Option<f64> = self.conn.query_row(
            "SELECT COUNT(DISTINCT page_id) * 1.0 / (SELECT COUNT(*) FROM pages)
             FROM index_entries WHERE lemma_id = ?1",
            params![lemma_id],
            |row| row.get(0),
        )?;
        Ok(fraction.unwrap_or(0.0))
    }

    // ===== Index Entry Management =====

    fn insert_index_entries(&mut self, entries: &[IndexEntry]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO index_entries (page_id, lemma_id, rank) VALUES (?1, ?2, ?3)",
            )?;
            for entry in entries {
                stmt.execute(params![entry.page_id, entry.lemma_id, entry.rank])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_index_entries_by_page(&mut self, page_id: i64) -> StorageResult<()> {
        self.conn.execute(
            "DELETE FROM index_entries WHERE page_id = ?1",
            params![page_id],
        )?;
        Ok(())
    }

    fn pages_with_lemma(&self, lemma_id: i64) -> StorageResult<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT page_id FROM index_entries WHERE lemma_id = ?1")?;

        let pages = stmt
            .query_map(params![lemma_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pages)
    }

    fn page_rank_sum(&self, page_id: i64) -> StorageResult<f64> {
        let sum: Option<f64> = self.conn.query_row(
            "SELECT SUM(rank) FROM index_entries WHERE page_id = ?1",
            params![page_id],
            |row| row.get(0),
        )?;
        Ok(sum.unwrap_or(0.0))
    }
}
