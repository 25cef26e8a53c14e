//! Link eligibility rules
//!
//! The same filter decides which sitemap URLs seed the frontier and which
//! outbound links of a fetched page are enqueued.

use crate::robots::RobotsRules;
use crate::url::domain::{is_same_site, site_key};
use crate::url::normalize::normalize_parsed;
use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

/// File extensions that never lead to an HTML page
pub const STATIC_EXTENSIONS: &[&str] = &[
    // Images
    "jpg", "jpeg", "png", "gif", "webp", "svg", "ico", "bmp", "tif", "tiff", "avif",
    // Documents
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods", "rtf", "csv", "txt", "epub",
    // Archives
    "zip", "tar", "gz", "tgz", "bz2", "xz", "rar", "7z",
    // Stylesheets, scripts and data
    "css", "js", "mjs", "map", "json", "xml",
    // Media
    "mp3", "mp4", "m4a", "wav", "ogg", "flac", "webm", "mov", "avi", "mkv",
    // Fonts
    "woff", "woff2", "ttf", "otf", "eot",
    // Binaries
    "exe", "dmg", "apk", "iso",
];

/// Paths that belong to site machinery rather than content
static NON_CONTENT_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^/(wp-admin|wp-login\.php|wp-json|wp-content|wp-includes|xmlrpc\.php|admin|administrator|login|log-in|signin|sign-in|signup|sign-up|register|logout|cart|checkout|basket|account|my-account|subscribe|unsubscribe|privacy|privacy-policy|terms|terms-of-service|terms-of-use|tos|cookie-policy|cookies|legal|disclaimer|imprint|cdn-cgi|_next)(/|$)",
    )
    .expect("valid non-content path pattern")
});

/// Feed endpoints anywhere in the path (`/feed`, `/comments/feed/`, `/rss`)
static FEED_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/(feed|rss|atom)/?$").expect("valid feed path pattern"));

/// Query parameters that mark searches, reply forms and share widgets
static NON_CONTENT_QUERY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(^|&)(s|q|query|search|replytocom|share|action|add-to-cart)=")
        .expect("valid non-content query pattern")
});

/// Returns true if the URL path ends in a tracked static-file extension
pub fn has_static_extension(path: &str) -> bool {
    let last_segment = path.rsplit('/').next().unwrap_or("");
    match last_segment.rsplit_once('.') {
        Some((_, ext)) => STATIC_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

/// Returns true if the URL points at admin, account, search, legal or CMS pages
pub fn is_non_content(url: &Url) -> bool {
    let path = url.path();
    if NON_CONTENT_PATH.is_match(path) || FEED_PATH.is_match(path) {
        return true;
    }

    match url.query() {
        Some(query) if !query.is_empty() => {
            let lower_path = path.to_lowercase();
            lower_path.starts_with("/search") || NON_CONTENT_QUERY.is_match(query)
        }
        _ => false,
    }
}

/// Decides whether discovered URLs belong in a source's frontier
#[derive(Debug, Clone)]
pub struct LinkFilter {
    site: String,
    robots: Option<RobotsRules>,
}

impl LinkFilter {
    /// Creates a filter for the site of `home`
    ///
    /// `robots` is `None` when robots.txt is not being respected or was never
    /// discovered, which allows every path.
    pub fn new(home: &Url, robots: Option<RobotsRules>) -> Self {
        Self {
            site: home.host_str().map(site_key).unwrap_or_default(),
            robots,
        }
    }

    /// Returns true if the URL passes every eligibility rule
    pub fn is_eligible(&self, url: &Url) -> bool {
        if url.scheme() != "http" && url.scheme() != "https" {
            return false;
        }

        if !is_same_site(url, &self.site) {
            return false;
        }

        if has_static_extension(url.path()) || is_non_content(url) {
            return false;
        }

        match &self.robots {
            Some(rules) => rules.is_url_allowed(url),
            None => true,
        }
    }

    /// Checks a candidate URL and returns its normalized form if eligible
    pub fn accept(&self, candidate: &str) -> Option<String> {
        let mut url = Url::parse(candidate.trim()).ok()?;
        if !self.is_eligible(&url) {
            return None;
        }
        normalize_parsed(&mut url).ok()
    }

    /// Filters, normalizes and deduplicates candidates, keeping first-seen order
    pub fn accept_all<'a, I>(&self, candidates: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        let mut seen = std::collections::HashSet::new();
        candidates
            .into_iter()
            .filter_map(|candidate| self.accept(candidate))
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }
}
