use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use quill_crawl::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Reduces a host to the key used for same-site comparisons
///
/// Hosts are compared case-insensitively and a leading `www.` is ignored, so
/// `www.example.com` and `example.com` count as the same site.
pub fn site_key(host: &str) -> String {
    let lower = host.to_lowercase();
    match lower.strip_prefix("www.") {
        Some(rest) => rest.to_string(),
        None => lower,
    }
}

/// Returns true if `url` is hosted on the same site as `site`
pub fn is_same_site(url: &Url, site: &str) -> bool {
    url.host_str()
        .map(|host| site_key(host) == site)
        .unwrap_or(false)
}
