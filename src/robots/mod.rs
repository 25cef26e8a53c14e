//! Robots.txt handling module
//!
//! This module provides fetching and parsing of robots.txt files into a
//! [`RobotsRules`] snapshot, and the path pattern matcher used to check URLs
//! against it.

mod parser;
mod pattern;

pub use parser::RobotsRules;
pub use pattern::matches_pattern;

use crate::crawler::Fetcher;
use tracing::{debug, warn};
use url::Url;

/// Fetches and parses robots.txt for a site
///
/// A missing, unreachable or unreadable robots.txt yields a fully permissive
/// ruleset. This never fails.
///
/// # Arguments
///
/// * `fetcher` - The HTTP fetcher to use
/// * `home_url` - Any URL on the site; only its origin is used
/// * `crawler_name` - This crawler's product token
pub async fn fetch_robots(fetcher: &Fetcher, home_url: &Url, crawler_name: &str) -> RobotsRules {
    let robots_url = match home_url.join("/robots.txt") {
        Ok(url) => url,
        Err(e) => {
            warn!("Cannot build robots.txt URL for {}: {}", home_url, e);
            return RobotsRules::allow_all();
        }
    };

    match fetcher.get_text(robots_url.as_str()).await {
        Ok(body) => {
            let rules = RobotsRules::parse(&body, crawler_name);
            debug!(
                "Parsed {}: {} disallow, {} allow, {} sitemaps",
                robots_url,
                rules.disallowed_paths.len(),
                rules.allowed_paths.len(),
                rules.sitemap_urls.len()
            );
            rules
        }
        Err(e) => {
            debug!("No usable robots.txt at {}: {}", robots_url, e);
            RobotsRules::allow_all()
        }
    }
}
