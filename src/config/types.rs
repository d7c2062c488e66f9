use serde::Deserialize;

/// Main configuration structure for Searchlight
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub sites: Vec<SiteEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Delay before fetching each page (milliseconds)
    #[serde(rename = "politeness-delay-ms")]
    pub politeness_delay_ms: u64,

    /// Maximum number of concurrent crawl tasks per site
    #[serde(rename = "max-concurrent-tasks")]
    pub max_concurrent_tasks: u32,

    /// Per-attempt fetch timeout during a full crawl (seconds)
    #[serde(rename = "fetch-timeout-secs")]
    pub fetch_timeout_secs: u64,

    /// Per-attempt fetch timeout when indexing a single page (seconds)
    #[serde(rename = "single-page-timeout-secs")]
    pub single_page_timeout_secs: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler bot
    #[serde(rename = "bot-name")]
    pub bot_name: String,

    /// Version of the crawler bot
    #[serde(rename = "bot-version")]
    pub bot_version: String,

    /// URL with information about the crawler
    #[serde(rename = "info-url")]
    pub info_url: String,

    /// Referrer header sent with every fetch
    pub referrer: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// One site to crawl and index
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Site root URL (normalized to scheme+host before use)
    pub url: String,

    /// Display name shown in search results and statistics
    pub name: String,
}
