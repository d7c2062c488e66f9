//! URL handling module for Searchlight
//!
//! This module provides the two normalization rules the rest of the crate
//! relies on: site base URLs are always stored as scheme+host (no `www.`
//! prefix, no trailing slash), and page paths are always stored with a
//! leading `/` and no trailing slash except for the root itself.

mod normalize;

pub use normalize::{normalize_base_url, normalize_path};

use crate::UrlError;
use url::Url;

/// Splits a full URL into its normalized site origin and page path
///
/// This is the parsing step used by single-page indexing: the origin is
/// matched against the configured site list, the path against the pages
/// table.
///
/// # Arguments
///
/// * `raw` - The full URL to split
///
/// # Returns
///
/// * `Ok((origin, path))` - Normalized origin and path
/// * `Err(UrlError)` - The URL could not be parsed
///
/// # Examples
///
/// ```
/// use searchlight::url::split_url;
///
/// let (origin, path) = split_url("https://www.example.com/news/today/").unwrap();
/// assert_eq!(origin, "https://example.com");
/// assert_eq!(path, "/news/today");
/// ```
pub fn split_url(raw: &str) -> Result<(String, String), UrlError> {
    let url = Url::parse(raw).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url.host_str().ok_or(UrlError::MissingHost)?;

    let origin = match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    };

    Ok((normalize_base_url(&origin)?, normalize_path(url.path())))
}
