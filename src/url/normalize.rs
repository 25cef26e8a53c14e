use crate::UrlError;
use url::Url;

/// Normalizes a URL into its frontier identity
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Require an HTTP or HTTPS scheme and a host
/// 3. Remove the fragment (everything after #)
/// 4. Remove a single trailing slash
///
/// Host case is already folded by the parser. The result is the string that
/// keys `(source, url)` uniqueness in the frontier and the article table.
///
/// # Examples
///
/// ```
/// use quill_crawl::url::normalize_url;
///
/// assert_eq!(normalize_url("https://Example.com/post/#top").unwrap(), "https://example.com/post");
/// assert_eq!(normalize_url("https://example.com/").unwrap(), "https://example.com");
/// ```
pub fn normalize_url(url_str: &str) -> Result<String, UrlError> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(&mut url)
}

/// Normalizes an already parsed URL in place and returns its frontier identity
pub fn normalize_parsed(url: &mut Url) -> Result<String, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    url.set_fragment(None);

    let mut normalized = url.to_string();
    // A slash inside the query belongs to a parameter value
    if url.query().is_none() && normalized.ends_with('/') {
        normalized.pop();
    }

    Ok(normalized)
}
