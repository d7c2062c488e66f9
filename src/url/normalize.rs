use crate::UrlError;
use url::Url;

/// Normalizes a site base URL
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Validate the scheme (HTTP and HTTPS only)
/// 3. Lowercase the host
/// 4. Remove the `www.` prefix
/// 5. Drop path, query, and fragment; keep an explicit port
/// 6. Never emit a trailing slash
///
/// The result is the canonical form under which a site is stored and
/// compared everywhere in the crate. The function is idempotent:
/// normalizing an already-normalized URL returns it unchanged.
///
/// # Arguments
///
/// * `url_str` - The URL string to normalize
///
/// # Returns
///
/// * `Ok(String)` - Normalized base URL, e.g. `https://example.com`
/// * `Err(UrlError)` - Failed to parse or normalize the URL
///
/// # Examples
///
/// ```
/// use searchlight::url::normalize_base_url;
///
/// let url = normalize_base_url("http://WWW.EXAMPLE.COM/page/").unwrap();
/// assert_eq!(url, "http://example.com");
/// ```
pub fn normalize_base_url(url_str: &str) -> Result<String, UrlError> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let host = url.host_str().ok_or(UrlError::MissingHost)?;
    let mut host = host.to_lowercase();
    if let Some(stripped) = host.strip_prefix("www.") {
        host = stripped.to_string();
    }

    Ok(match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    })
}

/// Normalizes a page path
///
/// An empty path becomes `/`; a trailing slash is removed unless the path
/// is the root itself. Paths are stored and compared in this form, which
/// is what makes the (site, path) uniqueness constraint meaningful.
pub fn normalize_path(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let mut path = path.to_string();
    while path.len() > 1 && path.ends_with('/') {
        path.pop();
    }

    if !path.starts_with('/') {
        path.insert(0, '/');
    }

    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_www() {
        assert_eq!(
            normalize_base_url("https://www.example.com").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn test_normalize_strips_trailing_slash() {
        assert_eq!(
            normalize_base_url("https://example.com/").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn test_normalize_drops_path_and_query() {
        assert_eq!(
            normalize_base_url("https://example.com/some/page?q=1#frag").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn test_normalize_lowercases_host() {
        assert_eq!(
            normalize_base_url("https://EXAMPLE.com").unwrap(),
            "https://example.com"
        );
    }

    #[test]
    fn test_normalize_keeps_port() {
        assert_eq!(
            normalize_base_url("http://127.0.0.1:4545/").unwrap(),
            "http://127.0.0.1:4545"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_base_url("http://WWW.Example.com/a/b/").unwrap();
        let twice = normalize_base_url(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_rejects_bad_scheme() {
        assert!(normalize_base_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_normalize_path_empty() {
        assert_eq!(normalize_path(""), "/");
    }

    #[test]
    fn test_normalize_path_root_kept() {
        assert_eq!(normalize_path("/"), "/");
    }

    #[test]
    fn test_normalize_path_trailing_slash() {
        assert_eq!(normalize_path("/news/"), "/news");
        assert_eq!(normalize_path("/news///"), "/news");
    }

    #[test]
    fn test_normalize_path_unchanged() {
        assert_eq!(normalize_path("/news/today"), "/news/today");
    }
}
