use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Quill
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub detector: DetectorConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub output: OutputConfig,
}

/// Crawl budget and politeness configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum link depth from a source's home page
    pub max_depth: u32,

    /// Maximum number of frontier entries a single source may ever hold
    pub max_pages_per_source: u32,

    /// Maximum number of entries processed per source in one crawl
    pub max_pages_per_run: u32,

    /// Minimum time between two requests to the same host (milliseconds)
    pub request_delay_ms: u64,

    /// Timeout applied to every HTTP request (milliseconds)
    pub timeout_ms: u64,

    /// Maximum redirect hops followed by a page fetch
    pub max_redirects: usize,

    /// Whether robots.txt rules are applied to queue entries and links
    pub respect_robots_txt: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages_per_source: 500,
            max_pages_per_run: 20,
            request_delay_ms: 1000,
            timeout_ms: 15_000,
            max_redirects: 5,
            respect_robots_txt: true,
        }
    }
}

impl CrawlerConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Article detector thresholds
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DetectorConfig {
    /// Word count that earns the full word-count signal
    pub min_word_count: usize,

    /// Confidence a page needs to be kept as an article
    pub min_confidence: f64,

    /// Word count a page needs to be kept as an article
    pub min_article_words: usize,

    /// Upper bound (in characters) on the stored article text
    pub max_content_length: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_word_count: 200,
            min_confidence: 0.4,
            min_article_words: 100,
            max_content_length: 50_000,
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler, also matched against robots.txt groups
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Formats the header value: `Name/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}
