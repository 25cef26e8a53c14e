//! HTML link extraction
//!
//! This module pulls out of an HTML page:
//! - Links to follow (from <a> tags and canonical links)
//! - Advertised RSS/Atom feeds (from <link rel="alternate">)
//! - The `<title>` text

use scraper::{Html, Selector};
use url::Url;

/// Feed MIME types recognized in `<link rel="alternate">`
const FEED_TYPES: &[&str] = &["application/rss+xml", "application/atom+xml"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// The page title (from <title> tag)
    pub title: Option<String>,

    /// All followable links found on the page (absolute URLs, in document order)
    pub links: Vec<String>,

    /// Feed URLs advertised in the page head (absolute URLs)
    pub feed_links: Vec<String>,
}

/// Parses HTML content and extracts links, feeds and the title
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` anywhere in the document
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs and fragment-only anchors
///
/// Eligibility (same site, static files, robots) is decided later by
/// [`crate::url::LinkFilter`].
///
/// # Example
///
/// ```no_run
/// use quill_crawl::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.title, Some("Test".to_string()));
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        links: extract_links(&document, base_url),
        feed_links: extract_feed_links(&document, base_url),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts all followable links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }

            if let Some(absolute_url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(absolute_url);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(absolute_url) = element
                .value()
                .attr("href")
                .and_then(|href| resolve_link(href, base_url))
            {
                links.push(absolute_url);
            }
        }
    }

    links
}

/// Extracts RSS/Atom feeds from `<link rel="alternate" type="...">`
fn extract_feed_links(document: &Html, base_url: &Url) -> Vec<String> {
    let mut feeds: Vec<String> = Vec::new();

    let Ok(selector) = Selector::parse("link[href][type]") else {
        return feeds;
    };

    for element in document.select(&selector) {
        let rel = element.value().attr("rel").unwrap_or("").to_lowercase();
        if !rel.split_whitespace().any(|token| token == "alternate") {
            continue;
        }

        let kind = element.value().attr("type").unwrap_or("").trim().to_lowercase();
        if !FEED_TYPES.contains(&kind.as_str()) {
            continue;
        }

        if let Some(absolute_url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, base_url))
        {
            if !feeds.contains(&absolute_url) {
                feeds.push(absolute_url);
            }
        }
    }

    feeds
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lowered = href.to_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lowered.starts_with(scheme))
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}
