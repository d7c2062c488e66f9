//! Retrying HTTP fetcher
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building an HTTP client with an identifying user agent
//! - Up-front DNS resolution that fails fast without retry
//! - A fixed retry budget with a fixed backoff between attempts
//! - Treating every response body as content, whatever the status code
//!   or content type

use crate::config::UserAgentConfig;
use crate::crawler::parser::parse_html;
use reqwest::{header, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Number of fetch attempts before giving up
const FETCH_ATTEMPTS: u32 = 3;

/// Sleep between failed attempts
const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Errors that can occur while fetching a page
#[derive(Debug, Error)]
pub enum FetchError {
    /// DNS resolution failed; never retried
    #[error("DNS resolution failed for {host}: {message}")]
    Dns { host: String, message: String },

    /// All attempts exhausted
    #[error("failed to fetch {url} after {attempts} attempts: {last_error}")]
    Network {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// HTTP status code; error codes are data, not failures
    pub status_code: u16,

    /// Raw response body
    pub content: String,

    /// Page title, if the document has one
    pub title: Option<String>,

    /// Outbound links, resolved to absolute URLs
    pub links: Vec<String>,
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use searchlight::config::UserAgentConfig;
/// use searchlight::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     bot_name: "SearchlightBot".to_string(),
///     bot_version: "1.0".to_string(),
///     info_url: "https://example.com/bot-info".to_string(),
///     referrer: "https://www.google.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    // Format: BotName/Version (+InfoURL)
    let user_agent = format!(
        "{}/{} (+{})",
        config.bot_name, config.bot_version, config.info_url
    );

    Client::builder()
        .user_agent(user_agent)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Retrying page fetcher
///
/// Holds the shared HTTP client, the fixed referrer header, and the
/// per-attempt timeout. Crawl tasks and single-page indexing use the
/// same fetcher type with different timeouts.
pub struct PageFetcher {
    client: Client,
    referrer: String,
    timeout: Duration,
}

impl PageFetcher {
    /// Creates a fetcher with the given per-attempt timeout
    pub fn new(client: Client, referrer: String, timeout: Duration) -> Self {
        Self {
            client,
            referrer,
            timeout,
        }
    }

    /// Fetches a URL, returning its status code, body, and outbound links
    ///
    /// The host is resolved before the first attempt; a resolution
    /// failure is returned immediately without touching the retry
    /// budget. Each attempt is bounded by the configured timeout, and
    /// failed attempts are separated by a fixed backoff. HTTP error
    /// statuses and non-HTML content types are NOT errors: whatever body
    /// the server returns is treated as page content.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        let parsed =
            Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        self.check_dns(&parsed).await?;

        let mut last_error = String::new();
        for attempt in 1..=FETCH_ATTEMPTS {
            if attempt > 1 {
                tokio::time::sleep(RETRY_BACKOFF).await;
            }

            match self.attempt(url).await {
                Ok(page) => return Ok(page),
                Err(e) => {
                    tracing::warn!(
                        "fetch attempt {}/{} failed for {}: {}",
                        attempt,
                        FETCH_ATTEMPTS,
                        url,
                        e
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(FetchError::Network {
            url: url.to_string(),
            attempts: FETCH_ATTEMPTS,
            last_error,
        })
    }

    /// Resolves the URL's host, failing fast on DNS errors
    async fn check_dns(&self, url: &Url) -> Result<(), FetchError> {
        let host = url
            .host_str()
            .ok_or_else(|| FetchError::InvalidUrl(format!("missing host in {}", url)))?;

        // IP literals need no resolution
        let bare = host.trim_start_matches('[').trim_end_matches(']');
        if bare.parse::<std::net::IpAddr>().is_ok() {
            return Ok(());
        }

        let port = url.port_or_known_default().unwrap_or(80);
        tokio::net::lookup_host((bare, port))
            .await
            .map_err(|e| FetchError::Dns {
                host: host.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    /// One GET attempt with the fixed headers and the per-attempt timeout
    async fn attempt(&self, url: &str) -> Result<FetchedPage, reqwest::Error> {
        let response = self
            .client
            .get(url)
            .header(header::REFERER, &self.referrer)
            .timeout(self.timeout)
            .send()
            .await?;

        let status_code = response.status().as_u16();
        let final_url = response.url().clone();
        let content = response.text().await?;

        let parsed = parse_html(&content, &final_url);

        Ok(FetchedPage {
            status_code,
            content,
            title: parsed.title,
            links: parsed.links,
        })
    }
}
