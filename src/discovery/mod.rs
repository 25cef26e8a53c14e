//! Source discovery
//!
//! Given a source's home URL, this module learns how to reach its content:
//! - robots.txt rules and advertised sitemaps
//! - RSS/Atom feeds (advertised or at conventional paths)
//! - sitemaps at well-known paths
//!
//! The three probes run concurrently and each degrades to an empty result;
//! discovery itself never fails.

mod feeds;
mod sitemaps;

pub use feeds::{discover_feeds, is_feed_content_type, FEED_PROBE_PATHS};
pub use sitemaps::{
    merge_sitemaps, parse_sitemap, probe_sitemaps, SitemapDocument, SITEMAP_PROBE_PATHS,
};

use crate::crawler::Fetcher;
use crate::robots::{fetch_robots, RobotsRules};
use crate::state::{SitemapType, SourceType};
use tracing::info;
use url::Url;

/// Everything discovery learned about a source
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryResult {
    /// Feed URLs, best first
    pub feeds: Vec<String>,

    /// Sitemap URLs with their kind, robots.txt entries first
    pub sitemaps: Vec<(String, SitemapType)>,

    /// Parsed robots.txt (permissive when absent)
    pub robots_rules: RobotsRules,

    /// How the source's content is best reached
    pub suggested_type: SourceType,
}

impl DiscoveryResult {
    /// First discovered feed, if any
    pub fn primary_feed(&self) -> Option<&str> {
        self.feeds.first().map(String::as_str)
    }
}

/// Runs discovery for a home URL
///
/// # Arguments
///
/// * `fetcher` - The HTTP fetcher to use
/// * `home_url` - The source's home page
/// * `crawler_name` - Product token matched against robots.txt groups
pub async fn discover_source(
    fetcher: &Fetcher,
    home_url: &Url,
    crawler_name: &str,
) -> DiscoveryResult {
    let (robots_rules, feeds, probed_sitemaps) = tokio::join!(
        fetch_robots(fetcher, home_url, crawler_name),
        discover_feeds(fetcher, home_url),
        probe_sitemaps(fetcher, home_url),
    );

    let sitemaps = merge_sitemaps(home_url, &robots_rules.sitemap_urls, &probed_sitemaps);
    let suggested_type = suggest_type(&feeds, &sitemaps);

    info!(
        "Discovered {}: {} feed(s), {} sitemap(s), {} robots rule(s), type {}",
        home_url,
        feeds.len(),
        sitemaps.len(),
        robots_rules.disallowed_paths.len() + robots_rules.allowed_paths.len(),
        suggested_type
    );

    DiscoveryResult {
        feeds,
        sitemaps,
        robots_rules,
        suggested_type,
    }
}

/// Feed beats sitemap beats homepage
pub fn suggest_type(feeds: &[String], sitemaps: &[(String, SitemapType)]) -> SourceType {
    if !feeds.is_empty() {
        SourceType::Feed
    } else if !sitemaps.is_empty() {
        SourceType::Sitemap
    } else {
        SourceType::Homepage
    }
}
