//! Integration tests for the search engine
//!
//! These tests build an index directly through the storage layer and
//! the IndexBuilder, then run ranked queries against it end-to-end:
//! relevance ordering and normalization, commonness filtering with its
//! fallback, pagination, and snippet/title extraction.

use searchlight::config::SiteEntry;
use searchlight::index::IndexBuilder;
use searchlight::search::{SearchEngine, SearchError};
use searchlight::storage::{SiteStatus, SqliteStorage, Storage};
use searchlight::Lemmatizer;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

struct TestIndex {
    storage: Arc<Mutex<SqliteStorage>>,
    builder: IndexBuilder,
    lemmatizer: Arc<Lemmatizer>,
    sites: Vec<SiteEntry>,
    _dir: TempDir,
}

fn create_index() -> TestIndex {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let storage = SqliteStorage::new(&dir.path().join("test.db")).expect("Failed to open DB");
    let storage = Arc::new(Mutex::new(storage));
    let lemmatizer = Arc::new(Lemmatizer::new());
    let builder = IndexBuilder::new(storage.clone(), lemmatizer.clone());

    TestIndex {
        storage,
        builder,
        lemmatizer,
        sites: Vec::new(),
        _dir: dir,
    }
}

impl TestIndex {
    /// Registers a site in storage and in the engine's configured list
    fn add_site(&mut self, url: &str, name: &str) -> i64 {
        let site_id = self
            .storage
            .lock()
            .unwrap()
            .insert_site(url, name, SiteStatus::Indexed)
            .unwrap();
        self.sites.push(SiteEntry {
            url: url.to_string(),
            name: name.to_string(),
        });
        site_id
    }

    /// Stores a page and runs the indexing pipeline over its content
    fn add_page(&self, site_id: i64, path: &str, content: &str) {
        let page = {
            let mut storage = self.storage.lock().unwrap();
            let page_id = storage.upsert_page(site_id, path, 200, content).unwrap();
            storage.get_page(page_id).unwrap()
        };
        self.builder.persist_page_index(&page).unwrap();
    }

    fn engine(&self) -> SearchEngine {
        SearchEngine::new(
            self.storage.clone(),
            self.lemmatizer.clone(),
            self.sites.clone(),
        )
    }
}

#[test]
fn test_empty_query_is_user_error() {
    let mut index = create_index();
    index.add_site("https://example.com", "Example");
    let engine = index.engine();

    assert!(matches!(
        engine.search("", None, 0, 10),
        Err(SearchError::EmptyQuery)
    ));
    assert!(matches!(
        engine.search("   ", None, 0, 10),
        Err(SearchError::EmptyQuery)
    ));
}

#[test]
fn test_relevance_ordering_and_normalization() {
    let mut index = create_index();
    let site_id = index.add_site("https://example.com", "Example");

    // A: cat x3 + dog x1 (rank sum 4); B: dog x5 (rank sum 5)
    index.add_page(site_id, "/a", "cat cat cat dog");
    index.add_page(site_id, "/b", "dog dog dog dog dog");

    let outcome = index.engine().search("dog", None, 0, 10).unwrap();

    assert_eq!(outcome.total, 2);
    assert_eq!(outcome.results.len(), 2);

    // B's own total rank dominates, so it leads with relevance 1.0
    assert_eq!(outcome.results[0].uri, "/b");
    assert!((outcome.results[0].relevance - 1.0).abs() < 1e-9);

    // A is normalized against the maximum rank sum: 4 / 5
    assert_eq!(outcome.results[1].uri, "/a");
    assert!((outcome.results[1].relevance - 0.8).abs() < 1e-9);
}

#[test]
fn test_commonness_filter_drops_ubiquitous_lemma() {
    let mut index = create_index();
    let site_id = index.add_site("https://example.com", "Example");

    // "common" is on all four pages (fraction 1.0, at the ceiling);
    // "rare" is on one (fraction 0.25)
    index.add_page(site_id, "/p1", "rare common");
    index.add_page(site_id, "/p2", "common");
    index.add_page(site_id, "/p3", "common");
    index.add_page(site_id, "/p4", "common");

    let outcome = index.engine().search("rare common", None, 0, 10).unwrap();

    // The over-common lemma is excluded from the required intersection,
    // so only the page with "rare" matches
    assert_eq!(outcome.total, 1);
    assert_eq!(outcome.results[0].uri, "/p1");
}

#[test]
fn test_filter_falls_back_when_all_candidates_dropped() {
    let mut index = create_index();
    let site_id = index.add_site("https://example.com", "Example");

    index.add_page(site_id, "/p1", "common");
    index.add_page(site_id, "/p2", "common");
    index.add_page(site_id, "/p3", "common");

    // "common" alone would be filtered out; the fallback searches with
    // the unfiltered candidate set instead of returning nothing
    let outcome = index.engine().search("common", None, 0, 10).unwrap();

    assert_eq!(outcome.total, 3);
}

#[test]
fn test_no_match_for_unknown_lemma() {
    let mut index = create_index();
    let site_id = index.add_site("https://example.com", "Example");
    index.add_page(site_id, "/", "cat dog");

    let outcome = index.engine().search("zebra", None, 0, 10).unwrap();

    assert_eq!(outcome.total, 0);
    assert!(outcome.results.is_empty());
}

#[test]
fn test_unindexed_site_yields_zero_results() {
    let mut index = create_index();
    index.sites.push(SiteEntry {
        url: "https://never-crawled.example.com".to_string(),
        name: "Never".to_string(),
    });

    let outcome = index.engine().search("anything", None, 0, 10).unwrap();

    assert_eq!(outcome.total, 0);
}

#[test]
fn test_all_query_lemmas_must_intersect() {
    let mut index = create_index();
    let site_id = index.add_site("https://example.com", "Example");

    // Padding pages keep both query lemmas under the commonness ceiling
    index.add_page(site_id, "/p1", "cat dog filler");
    index.add_page(site_id, "/p2", "cat filler");
    index.add_page(site_id, "/p3", "dog filler");
    index.add_page(site_id, "/p4", "filler padding");
    index.add_page(site_id, "/p5", "filler padding");

    let outcome = index.engine().search("cat dog", None, 0, 10).unwrap();

    // Only the page containing both lemmas survives the intersection
    assert_eq!(outcome.total, 1);
    assert_eq!(outcome.results[0].uri, "/p1");
}

#[test]
fn test_pagination_after_full_ranking() {
    let mut index = create_index();
    let site_id = index.add_site("https://example.com", "Example");

    // Distinct rank sums give a deterministic relevance order
    index.add_page(site_id, "/low", "fish");
    index.add_page(site_id, "/mid", "fish fish fish");
    index.add_page(site_id, "/high", "fish fish fish fish fish");

    let outcome = index.engine().search("fish", None, 1, 1).unwrap();

    // Total reflects every match; the window lands after the sort
    assert_eq!(outcome.total, 3);
    assert_eq!(outcome.results.len(), 1);
    assert_eq!(outcome.results[0].uri, "/mid");
}

#[test]
fn test_result_fields_title_and_snippet() {
    let mut index = create_index();
    let site_id = index.add_site("https://example.com", "Example");

    index.add_page(
        site_id,
        "/cats",
        "<html><head><title>Cat Page</title></head><body>Cats are wonderful animals</body></html>",
    );

    let outcome = index.engine().search("cat", None, 0, 10).unwrap();

    assert_eq!(outcome.total, 1);
    let result = &outcome.results[0];
    assert_eq!(result.site, "https://example.com");
    assert_eq!(result.site_name, "Example");
    assert_eq!(result.uri, "/cats");
    assert_eq!(result.title, "Cat Page");
    // The inflected surface form is wrapped in emphasis markup
    assert!(result.snippet.contains("<b>Cat"), "{}", result.snippet);
}

#[test]
fn test_snippet_falls_back_to_raw_content() {
    let mut index = create_index();
    let site_id = index.add_site("https://example.com", "Example");

    // Query by a lemma, then overwrite the content so no surface form
    // of it remains for the highlighter to find
    index.add_page(site_id, "/p", "orange");
    {
        let mut storage = index.storage.lock().unwrap();
        storage.upsert_page(site_id, "/p", 200, "### ###").unwrap();
    }

    let outcome = index.engine().search("orange", None, 0, 10).unwrap();

    assert_eq!(outcome.total, 1);
    assert_eq!(outcome.results[0].snippet, "### ###");
}

#[test]
fn test_multi_site_results_are_concatenated() {
    let mut index = create_index();
    let site_a = index.add_site("https://alpha.example.com", "Alpha");
    let site_b = index.add_site("https://beta.example.com", "Beta");

    index.add_page(site_a, "/a", "shared topic plus alpha words");
    index.add_page(site_b, "/b", "shared topic plus beta words");

    let outcome = index.engine().search("shared", None, 0, 10).unwrap();

    assert_eq!(outcome.total, 2);
    let names: Vec<&str> = outcome
        .results
        .iter()
        .map(|r| r.site_name.as_str())
        .collect();
    assert!(names.contains(&"Alpha"));
    assert!(names.contains(&"Beta"));
}

#[test]
fn test_site_filter_limits_scope() {
    let mut index = create_index();
    let site_a = index.add_site("https://alpha.example.com", "Alpha");
    let site_b = index.add_site("https://beta.example.com", "Beta");

    index.add_page(site_a, "/a", "shared topic plus alpha words");
    index.add_page(site_b, "/b", "shared topic plus beta words");

    let outcome = index
        .engine()
        .search("shared", Some("https://alpha.example.com"), 0, 10)
        .unwrap();

    assert_eq!(outcome.total, 1);
    assert_eq!(outcome.results[0].site_name, "Alpha");
    assert_eq!(outcome.results[0].uri, "/a");
}

#[test]
fn test_russian_query_matches_inflected_forms() {
    let mut index = create_index();
    let site_id = index.add_site("https://example.com", "Example");

    index.add_page(site_id, "/ru", "Наши кошки спят весь день");
    index.add_page(site_id, "/other", "Собаки лают во дворе");

    // A different inflection of the same word reaches the same lemma
    let outcome = index.engine().search("кошка", None, 0, 10).unwrap();

    assert_eq!(outcome.total, 1);
    assert_eq!(outcome.results[0].uri, "/ru");
}
