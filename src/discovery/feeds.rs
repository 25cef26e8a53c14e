//! Feed discovery

use crate::crawler::{parse_html, Fetcher};
use tracing::debug;
use url::Url;

/// Conventional feed locations, probed in order when the homepage
/// advertises none
pub const FEED_PROBE_PATHS: &[&str] = &["/feed", "/rss", "/feed.xml", "/rss.xml", "/atom.xml"];

/// Finds the feeds of a site
///
/// Feeds advertised by `<link rel="alternate">` on the homepage win. Without
/// any, the conventional paths are HEAD-probed and the first one whose
/// content type mentions xml, rss or atom is returned.
pub async fn discover_feeds(fetcher: &Fetcher, home_url: &Url) -> Vec<String> {
    match fetcher.get_text(home_url.as_str()).await {
        Ok(html) => {
            let advertised = parse_html(&html, home_url).feed_links;
            if !advertised.is_empty() {
                debug!("{} advertises {} feed(s)", home_url, advertised.len());
                return advertised;
            }
        }
        Err(e) => debug!("Homepage {} unavailable for feed hints: {}", home_url, e),
    }

    probe_feed_paths(fetcher, home_url)
        .await
        .into_iter()
        .collect()
}

async fn probe_feed_paths(fetcher: &Fetcher, home_url: &Url) -> Option<String> {
    for path in FEED_PROBE_PATHS {
        let Ok(candidate) = home_url.join(path) else {
            continue;
        };

        match fetcher.head(candidate.as_str()).await {
            Ok(head) if head.is_success() && is_feed_content_type(&head.content_type) => {
                debug!("Found feed at {}", candidate);
                return Some(candidate.to_string());
            }
            Ok(_) => {}
            Err(e) => debug!("Feed probe {} failed: {}", candidate, e),
        }
    }
    None
}

/// Returns true if a content type looks like a feed
pub fn is_feed_content_type(content_type: &str) -> bool {
    let content_type = content_type.to_lowercase();
    ["xml", "rss", "atom"]
        .iter()
        .any(|marker| content_type.contains(marker))
}
