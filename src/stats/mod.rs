//! Statistics rollup over the crawl index
//!
//! Read-only per-site and total counts. Sites the crawler has not
//! reached yet are still reported, using their configuration data with
//! zero counts.

use crate::config::SiteEntry;
use crate::storage::{SiteStatus, Storage, StorageError};
use crate::url::normalize_base_url;

/// Statistics for one configured site
#[derive(Debug, Clone)]
pub struct SiteStatistics {
    pub url: String,
    pub name: String,

    /// None when the site has not been crawled yet
    pub status: Option<SiteStatus>,
    pub status_time: Option<String>,
    pub last_error: Option<String>,

    pub pages: u64,
    pub lemmas: u64,
}

/// Aggregate statistics across the whole index
#[derive(Debug, Clone)]
pub struct TotalStatistics {
    pub sites: u64,
    pub pages: u64,
    pub lemmas: u64,

    /// True while any site is being indexed
    pub indexing: bool,
}

/// Full statistics report
#[derive(Debug, Clone)]
pub struct StatisticsReport {
    pub total: TotalStatistics,
    pub detailed: Vec<SiteStatistics>,
}

/// Loads statistics for every configured site plus index-wide totals
///
/// # Arguments
///
/// * `storage` - The storage backend to query
/// * `sites` - The configured site list
pub fn load_statistics(
    storage: &dyn Storage,
    sites: &[SiteEntry],
) -> Result<StatisticsReport, StorageError> {
    let mut detailed = Vec::with_capacity(sites.len());

    for entry in sites {
        let url = normalize_base_url(&entry.url).unwrap_or_else(|_| entry.url.clone());

        let item = match storage.find_site_by_url(&url)? {
            Some(site) => SiteStatistics {
                url: site.url.clone(),
                name: site.name.clone(),
                status: Some(site.status),
                status_time: Some(site.status_time.clone()),
                last_error: site.last_error.clone(),
                pages: storage.count_pages_by_site(site.id)?,
                lemmas: storage.count_lemmas_by_site(site.id)?,
            },
            None => {
                tracing::debug!("site {} not in storage, reporting config data", url);
                SiteStatistics {
                    url,
                    name: entry.name.clone(),
                    status: None,
                    status_time: None,
                    last_error: None,
                    pages: 0,
                    lemmas: 0,
                }
            }
        };

        detailed.push(item);
    }

    let total = TotalStatistics {
        sites: storage.count_sites()?,
        pages: storage.count_total_pages()?,
        lemmas: storage.count_total_lemmas()?,
        indexing: storage.site_exists_with_status(SiteStatus::Indexing)?,
    };

    Ok(StatisticsReport { total, detailed })
}

/// Prints a statistics report to stdout in a formatted manner
pub fn print_statistics(report: &StatisticsReport) {
    println!("=== Index Statistics ===\n");

    println!("Totals:");
    println!("  Sites: {}", report.total.sites);
    println!("  Pages: {}", report.total.pages);
    println!("  Lemmas: {}", report.total.lemmas);
    println!(
        "  Indexing active: {}",
        if report.total.indexing { "yes" } else { "no" }
    );
    println!();

    println!("Sites:");
    for site in &report.detailed {
        let status = site
            .status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "NOT CRAWLED".to_string());

        println!("  {} ({})", site.url, site.name);
        println!(
            "    status: {}  pages: {}  lemmas: {}",
            status, site.pages, site.lemmas
        );
        if let Some(time) = &site.status_time {
            println!("    status time: {}", time);
        }
        if let Some(error) = &site.last_error {
            println!("    last error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStorage;

    fn site_entry(url: &str, name: &str) -> SiteEntry {
        SiteEntry {
            url: url.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_uncrawled_site_reports_config_data() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        let sites = vec![site_entry("https://example.com", "Example")];

        let report = load_statistics(&storage, &sites).unwrap();

        assert_eq!(report.detailed.len(), 1);
        let item = &report.detailed[0];
        assert_eq!(item.url, "https://example.com");
        assert_eq!(item.name, "Example");
        assert!(item.status.is_none());
        assert_eq!(item.pages, 0);
        assert_eq!(item.lemmas, 0);
        assert_eq!(report.total.sites, 0);
        assert!(!report.total.indexing);
    }

    #[test]
    fn test_crawled_site_counts() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let site_id = storage
            .insert_site("https://example.com", "Example", SiteStatus::Indexed)
            .unwrap();
        storage.upsert_page(site_id, "/", 200, "cat").unwrap();
        storage.upsert_page(site_id, "/a", 200, "dog").unwrap();
        storage.upsert_lemma(site_id, "cat").unwrap();

        let sites = vec![site_entry("https://www.example.com/", "Example")];
        let report = load_statistics(&storage, &sites).unwrap();

        let item = &report.detailed[0];
        assert_eq!(item.status, Some(SiteStatus::Indexed));
        assert_eq!(item.pages, 2);
        assert_eq!(item.lemmas, 1);
        assert_eq!(report.total.sites, 1);
        assert_eq!(report.total.pages, 2);
    }

    #[test]
    fn test_indexing_flag() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        storage
            .insert_site("https://example.com", "Example", SiteStatus::Indexing)
            .unwrap();

        let report = load_statistics(&storage, &[]).unwrap();
        assert!(report.total.indexing);
    }
}
