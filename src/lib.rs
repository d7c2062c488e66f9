//! Searchlight: a site-list search engine
//!
//! This crate crawls a fixed, configured list of web sites, builds a
//! per-site inverted index of morphologically normalized words (lemmas),
//! and answers ranked full-text queries against that index.

pub mod config;
pub mod crawler;
pub mod index;
pub mod lemma;
pub mod search;
pub mod stats;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Searchlight operations
#[derive(Debug, Error)]
pub enum SearchlightError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Indexing error: {0}")]
    Index(#[from] index::IndexError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Searchlight operations
pub type Result<T> = std::result::Result<T, SearchlightError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use lemma::Lemmatizer;
pub use storage::SiteStatus;
pub use url::{normalize_base_url, normalize_path, split_url};
