//! Robots.txt parser implementation
//!
//! Groups are tracked line by line. A group applies to this crawler when one
//! of its `User-agent` tokens is `*`, contains "bot", or equals the crawler's
//! own name. `Sitemap` directives are global and always collected.

use crate::robots::pattern::matches_pattern;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Longest `Crawl-delay` honored; larger values are clamped to this
pub const MAX_CRAWL_DELAY_SECS: f64 = 60.0;

/// Normalized robots.txt ruleset for one source
///
/// This is an immutable snapshot; re-discovery replaces it wholesale.
/// `allowed_paths` take precedence over `disallowed_paths`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RobotsRules {
    /// Path patterns this crawler must not fetch
    pub disallowed_paths: Vec<String>,

    /// Path patterns explicitly allowed, overriding any disallow
    pub allowed_paths: Vec<String>,

    /// Requested delay between requests, in seconds
    pub crawl_delay_seconds: Option<f64>,

    /// Sitemaps advertised by the site
    pub sitemap_urls: Vec<String>,
}

impl RobotsRules {
    /// Creates a permissive ruleset that allows everything
    ///
    /// This is the result whenever robots.txt is missing or cannot be fetched.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parses robots.txt content for the given crawler name
    ///
    /// # Arguments
    ///
    /// * `content` - The raw robots.txt file content
    /// * `crawler_name` - This crawler's product token (e.g. "QuillBot")
    pub fn parse(content: &str, crawler_name: &str) -> Self {
        let mut rules = Self::default();
        let crawler_name = crawler_name.to_lowercase();

        // Consecutive User-agent lines form one group
        let mut group_relevant = false;
        let mut in_agent_lines = false;

        for line in content.lines() {
            // Strip comments
            let line = match line.split_once('#') {
                Some((before, _)) => before,
                None => line,
            }
            .trim();

            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                if !in_agent_lines {
                    group_relevant = false;
                    in_agent_lines = true;
                }
                group_relevant |= is_relevant_agent(value, &crawler_name);
                continue;
            }
            in_agent_lines = false;

            match key.as_str() {
                "sitemap" => {
                    if !value.is_empty() && !rules.sitemap_urls.iter().any(|s| s == value) {
                        rules.sitemap_urls.push(value.to_string());
                    }
                }
                "disallow" if group_relevant && !value.is_empty() => {
                    rules.disallowed_paths.push(value.to_string());
                }
                "allow" if group_relevant && !value.is_empty() => {
                    rules.allowed_paths.push(value.to_string());
                }
                "crawl-delay" if group_relevant => {
                    if let Ok(delay) = value.parse::<f64>() {
                        if delay.is_finite() && delay >= 0.0 {
                            let delay = if delay > MAX_CRAWL_DELAY_SECS {
                                warn!(
                                    "Crawl-delay {} exceeds {}s, clamping",
                                    value, MAX_CRAWL_DELAY_SECS
                                );
                                MAX_CRAWL_DELAY_SECS
                            } else {
                                delay
                            };
                            // Several relevant groups: keep the most conservative
                            let current = rules.crawl_delay_seconds.unwrap_or(0.0);
                            rules.crawl_delay_seconds = Some(current.max(delay));
                        }
                    }
                }
                _ => {}
            }
        }

        rules
    }

    /// Returns true if nothing is restricted
    pub fn is_permissive(&self) -> bool {
        self.disallowed_paths.is_empty()
    }

    /// Checks a path (optionally with `?query`) against the rules
    ///
    /// Allowed patterns are checked first, then disallowed ones; anything
    /// unmatched is allowed.
    pub fn is_allowed(&self, path: &str) -> bool {
        if self
            .allowed_paths
            .iter()
            .any(|pattern| matches_pattern(pattern, path))
        {
            return true;
        }

        !self
            .disallowed_paths
            .iter()
            .any(|pattern| matches_pattern(pattern, path))
    }

    /// Checks a full URL against the rules using its path and query
    pub fn is_url_allowed(&self, url: &Url) -> bool {
        match url.query() {
            Some(query) => self.is_allowed(&format!("{}?{}", url.path(), query)),
            None => self.is_allowed(url.path()),
        }
    }

    /// Returns the requested crawl delay, if any
    ///
    /// Rules deserialized from storage are clamped again, so the result
    /// never exceeds `MAX_CRAWL_DELAY_SECS`.
    pub fn crawl_delay(&self) -> Option<Duration> {
        self.crawl_delay_seconds
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs.min(MAX_CRAWL_DELAY_SECS)).ok())
    }
}

/// Decides whether a `User-agent` token addresses this crawler
fn is_relevant_agent(token: &str, crawler_name: &str) -> bool {
    let token = token.to_lowercase();
    token == "*" || token.contains("bot") || token == crawler_name
}
