//! Sitemap probing and parsing

use crate::crawler::Fetcher;
use crate::state::SitemapType;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::debug;
use url::Url;

/// Well-known sitemap locations, probed in order
pub const SITEMAP_PROBE_PATHS: &[&str] = &[
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap-index.xml",
    "/wp-sitemap.xml",
    "/post-sitemap.xml",
    "/news-sitemap.xml",
];

/// Parsed content of a sitemap document
#[derive(Debug, Clone, PartialEq)]
pub enum SitemapDocument {
    /// `<urlset>`: page URLs from `<url><loc>`
    UrlSet(Vec<String>),
    /// `<sitemapindex>`: child sitemap URLs from `<sitemap><loc>`
    Index(Vec<String>),
}

impl SitemapDocument {
    /// Number of `<loc>` entries in the document
    pub fn loc_count(&self) -> usize {
        match self {
            Self::UrlSet(urls) | Self::Index(urls) => urls.len(),
        }
    }
}

/// HEAD-probes the well-known sitemap paths of a site
///
/// A path is accepted when it answers 200, or any 2xx with an XML content
/// type. Probe failures are ignored.
pub async fn probe_sitemaps(fetcher: &Fetcher, home_url: &Url) -> Vec<String> {
    let mut found = Vec::new();

    for path in SITEMAP_PROBE_PATHS {
        let Ok(candidate) = home_url.join(path) else {
            continue;
        };

        match fetcher.head(candidate.as_str()).await {
            Ok(head) if head.status_code == 200 || (head.is_success() && head.is_xml()) => {
                debug!("Found sitemap at {}", candidate);
                found.push(candidate.to_string());
            }
            Ok(head) => debug!("No sitemap at {} (HTTP {})", candidate, head.status_code),
            Err(e) => debug!("Sitemap probe {} failed: {}", candidate, e),
        }
    }

    found
}

/// Merges robots.txt sitemaps with probed ones and classifies each
///
/// Robots.txt entries come first; relative entries are resolved against the
/// home URL and duplicates are dropped.
pub fn merge_sitemaps(
    home_url: &Url,
    from_robots: &[String],
    probed: &[String],
) -> Vec<(String, SitemapType)> {
    let mut merged: Vec<(String, SitemapType)> = Vec::new();

    for raw in from_robots.iter().chain(probed.iter()) {
        let Ok(resolved) = home_url.join(raw.trim()) else {
            continue;
        };
        if !matches!(resolved.scheme(), "http" | "https") {
            continue;
        }

        let resolved = resolved.to_string();
        if merged.iter().any(|(existing, _)| *existing == resolved) {
            continue;
        }

        let kind = SitemapType::from_url(&resolved);
        merged.push((resolved, kind));
    }

    merged
}

/// Parses a sitemap XML document
///
/// Only `<loc>` elements directly inside `<url>` (urlset) or `<sitemap>`
/// (index) entries are collected; image and video extension tags are
/// ignored.
pub fn parse_sitemap(xml: &str) -> Result<SitemapDocument, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut root: Option<bool> = None; // Some(true) = index
    let mut in_entry = false;
    let mut in_loc = false;
    let mut current = String::new();
    let mut locs = Vec::new();

    loop {
        match reader.read_event() {
            // Prefixed names such as `image:loc` belong to extensions
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"urlset" if root.is_none() => root = Some(false),
                b"sitemapindex" if root.is_none() => root = Some(true),
                b"url" | b"sitemap" if root.is_some() => in_entry = true,
                b"loc" if in_entry => {
                    in_loc = true;
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_loc => {
                let text = t.unescape().map_err(|e| e.to_string())?;
                current.push_str(&text);
            }
            Ok(Event::CData(c)) if in_loc => {
                current.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"loc" if in_loc => {
                    in_loc = false;
                    let loc = current.trim();
                    if !loc.is_empty() {
                        locs.push(loc.to_string());
                    }
                }
                b"url" | b"sitemap" => in_entry = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
        }
    }

    match root {
        Some(true) => Ok(SitemapDocument::Index(locs)),
        Some(false) => Ok(SitemapDocument::UrlSet(locs)),
        None => Err("Document is neither a urlset nor a sitemapindex".to_string()),
    }
}
