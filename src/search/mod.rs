//! Ranked full-text search
//!
//! This module answers queries against the lemma index built during
//! crawling. Query terms are lemmatized, resolved per site, filtered by
//! a commonness ceiling, and intersected rarest-first; each surviving
//! page is scored by its total stored rank and presented with a title
//! and a highlighted snippet.

use crate::config::SiteEntry;
use crate::lemma::Lemmatizer;
use crate::storage::{LemmaRecord, SqliteStorage, Storage, StorageError};
use crate::url::normalize_base_url;
use crate::UrlError;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Lemmas at or above this share of the commonness ceiling are dropped
/// from the query before intersection
const COMMONNESS_FACTOR: f64 = 0.75;

/// Maximum snippet length in characters
const SNIPPET_MAX_CHARS: usize = 300;

/// Raw-content fallback length when no highlighted window is found
const SNIPPET_FALLBACK_CHARS: usize = 200;

/// Errors returned by the search engine
#[derive(Debug, Error)]
pub enum SearchError {
    /// Blank or whitespace-only query; a user error, never retried
    #[error("search query is empty")]
    EmptyQuery,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Url(#[from] UrlError),
}

/// One ranked search hit
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// Normalized site URL
    pub site: String,

    /// Site display name from the configuration
    pub site_name: String,

    /// Page path within the site
    pub uri: String,

    /// Text of the page's first <title> tag, empty if absent
    pub title: String,

    /// Highlighted content snippet
    pub snippet: String,

    /// Relevance normalized to the best page in the result set
    pub relevance: f64,
}

/// A completed search: the full match count plus the requested page
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    pub total: usize,
    pub results: Vec<SearchResult>,
}

/// Ranked query engine over the lemma index
///
/// Stateless per call; safe to share and invoke concurrently with
/// crawling.
pub struct SearchEngine {
    storage: Arc<Mutex<SqliteStorage>>,
    lemmatizer: Arc<Lemmatizer>,
    sites: Vec<SiteEntry>,
}

impl SearchEngine {
    pub fn new(
        storage: Arc<Mutex<SqliteStorage>>,
        lemmatizer: Arc<Lemmatizer>,
        sites: Vec<SiteEntry>,
    ) -> Self {
        Self {
            storage,
            lemmatizer,
            sites,
        }
    }

    /// Runs a ranked query
    ///
    /// With a site given, only that site is searched; otherwise every
    /// configured site is searched and the per-site result lists are
    /// concatenated with their totals summed (no cross-site re-rank).
    /// Pagination applies per site, strictly after the full relevance
    /// sort.
    pub fn search(
        &self,
        query: &str,
        site: Option<&str>,
        offset: usize,
        limit: usize,
    ) -> Result<SearchOutcome, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        tracing::info!(
            "search: query='{}' site={:?} offset={} limit={}",
            query,
            site,
            offset,
            limit
        );

        let query_lemmas = self.lemmatizer.lemma_set(query);

        let scope: Vec<(String, String)> = match site {
            Some(url) => {
                let normalized = normalize_base_url(url)?;
                let name = self
                    .sites
                    .iter()
                    .find(|s| normalize_base_url(&s.url).map_or(false, |u| u == normalized))
                    .map(|s| s.name.clone())
                    .unwrap_or_default();
                vec![(normalized, name)]
            }
            None => self
                .sites
                .iter()
                .filter_map(|s| normalize_base_url(&s.url).ok().map(|u| (u, s.name.clone())))
                .collect(),
        };

        let mut total = 0;
        let mut results = Vec::new();

        for (site_url, site_name) in scope {
            let (site_total, site_results) =
                self.search_site(&query_lemmas, &site_url, &site_name, offset, limit)?;
            total += site_total;
            results.extend(site_results);
        }

        tracing::info!("search done: {} of {} results returned", results.len(), total);

        Ok(SearchOutcome { total, results })
    }

    /// Searches one site, returning its full match count and result page
    fn search_site(
        &self,
        query_lemmas: &HashSet<String>,
        site_url: &str,
        site_name: &str,
        offset: usize,
        limit: usize,
    ) -> Result<(usize, Vec<SearchResult>), SearchError> {
        let storage = self.storage.lock().unwrap();

        let site = match storage.find_site_by_url(site_url)? {
            Some(site) => site,
            None => {
                tracing::debug!("site not indexed yet: {}", site_url);
                return Ok((0, Vec::new()));
            }
        };

        // Resolve query lemmas against this site's lemma table
        let mut candidates: Vec<LemmaRecord> = Vec::new();
        for lemma in query_lemmas {
            if let Some(record) = storage.find_lemma(site.id, lemma)? {
                candidates.push(record);
            }
        }
        if candidates.is_empty() {
            return Ok((0, Vec::new()));
        }

        // Drop lemmas too common across the whole index, but never all
        // of them: an over-aggressive filter falls back to the full
        // candidate set instead of returning nothing
        let ceiling = storage
            .max_lemma_frequency_fraction(site.id)?
            .unwrap_or(0.0)
            * COMMONNESS_FACTOR;

        let mut filtered: Vec<LemmaRecord> = Vec::new();
        for candidate in &candidates {
            if storage.lemma_page_fraction(candidate.id)? < ceiling {
                filtered.push(candidate.clone());
            }
        }
        if filtered.is_empty() {
            filtered = candidates;
        }

        // Rarest lemma first keeps the intersection small from the start
        filtered.sort_by(|a, b| {
            a.frequency
                .cmp(&b.frequency)
                .then_with(|| a.lemma.cmp(&b.lemma))
        });

        let mut pages: HashSet<i64> = storage.pages_with_lemma(filtered[0].id)?.into_iter().collect();
        for lemma in &filtered[1..] {
            let with_lemma: HashSet<i64> =
                storage.pages_with_lemma(lemma.id)?.into_iter().collect();
            pages.retain(|id| with_lemma.contains(id));
            if pages.is_empty() {
                return Ok((0, Vec::new()));
            }
        }
        if pages.is_empty() {
            return Ok((0, Vec::new()));
        }

        let mut page_ids: Vec<i64> = pages.into_iter().collect();
        page_ids.sort_unstable();

        let mut rank_sums = Vec::with_capacity(page_ids.len());
        for &page_id in &page_ids {
            rank_sums.push(storage.page_rank_sum(page_id)?);
        }
        let max_relevance = rank_sums
            .iter()
            .cloned()
            .fold(f64::NAN, f64::max);
        let max_relevance = if max_relevance.is_nan() || max_relevance == 0.0 {
            1.0
        } else {
            max_relevance
        };

        let query_set: HashSet<String> = filtered.iter().map(|l| l.lemma.clone()).collect();

        let mut items = Vec::with_capacity(page_ids.len());
        for (&page_id, &rank_sum) in page_ids.iter().zip(&rank_sums) {
            let page = storage.get_page(page_id)?;

            items.push(SearchResult {
                site: site.url.clone(),
                site_name: site_name.to_string(),
                uri: page.path.clone(),
                title: extract_title(&page.content),
                snippet: self.build_snippet(&page.content, &query_set),
                relevance: rank_sum / max_relevance,
            });
        }

        items.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(Ordering::Equal)
        });

        let total = items.len();
        let page: Vec<SearchResult> = items.into_iter().skip(offset).take(limit).collect();

        Ok((total, page))
    }

    /// Builds the highlighted snippet for one page
    ///
    /// Every inflected surface occurrence of a query lemma contributes a
    /// window of surrounding word-like characters with the surface form
    /// wrapped in `<b>` tags; the window seen most often wins, first
    /// seen winning ties.
    fn build_snippet(&self, content: &str, query_lemmas: &HashSet<String>) -> String {
        let occurrences = self.lemmatizer.lemma_occurrences(content);

        // Windows in first-seen order with their recurrence counts
        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut scanned_surfaces: HashSet<String> = HashSet::new();

        for occurrence in &occurrences {
            if !query_lemmas.contains(&occurrence.lemma) {
                continue;
            }
            // Each distinct surface form is scanned once over the content
            if !scanned_surfaces.insert(occurrence.surface.clone()) {
                continue;
            }

            let window_pattern = format!(
                r"(?i)[\w\s()\-,/]*{}[\w\s()\-,/]*",
                regex::escape(&occurrence.surface)
            );
            let Ok(window_re) = Regex::new(&window_pattern) else {
                continue;
            };

            for window in window_re.find_iter(content) {
                let highlighted = highlight(window.as_str(), &occurrence.surface);
                let count = counts.entry(highlighted.clone()).or_insert(0);
                if *count == 0 {
                    order.push(highlighted);
                }
                *count += 1;
            }
        }

        // Strictly-greater comparison keeps the first-seen window on ties
        let mut best: Option<(&String, usize)> = None;
        for window in &order {
            let count = counts.get(window).copied().unwrap_or(0);
            if best.map_or(true, |(_, c)| count > c) {
                best = Some((window, count));
            }
        }

        match best.map(|(window, _)| window) {
            Some(window) => truncate_chars(window, SNIPPET_MAX_CHARS),
            None => content.chars().take(SNIPPET_FALLBACK_CHARS).collect(),
        }
    }
}

/// Extracts the text between the first <title> and </title> tags
fn extract_title(content: &str) -> String {
    match (content.find("<title>"), content.find("</title>")) {
        (Some(start), Some(end)) if end > start => {
            content[start + "<title>".len()..end].trim().to_string()
        }
        _ => String::new(),
    }
}

/// Wraps every case-insensitive occurrence of `surface` in <b> tags
fn highlight(window: &str, surface: &str) -> String {
    let pattern = format!("(?i){}", regex::escape(surface));
    match Regex::new(&pattern) {
        Ok(re) => re
            .replace_all(window, |captures: &regex::Captures<'_>| {
                format!("<b>{}</b>", &captures[0])
            })
            .into_owned(),
        Err(_) => window.to_string(),
    }
}

/// Truncates to a character budget, appending an ellipsis when cut
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push('…');
    truncated
}
