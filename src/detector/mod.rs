//! Article detection
//!
//! Decides whether a fetched page is an article worth keeping and extracts
//! its title, author, publish date, summary and main text. Detection is
//! pure: the same URL and HTML always give the same analysis, and it never
//! fails.

mod extract;
mod signals;

pub use extract::parse_date;
pub use signals::{score, PageFeatures, Signal, SHORT_ARTICLE_WORDS, SIGNALS};

use crate::config::DetectorConfig;
use chrono::{DateTime, Utc};
use scraper::Html;
use url::Url;

/// Result of analyzing one page
#[derive(Debug, Clone, PartialEq)]
pub struct PageAnalysis {
    pub is_article: bool,
    /// Confidence in [0, 1]
    pub confidence: f64,
    pub title: Option<String>,
    /// Main text, capped at `max_content_length` characters
    pub content: String,
    pub published_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub summary: Option<String>,
    /// Whitespace-separated words in the full main text
    pub word_count: usize,
    /// Human-readable reasons for every signal that fired
    pub reasons: Vec<String>,
}

/// Analyzes a page
///
/// # Arguments
///
/// * `url` - The page URL (only its path is used)
/// * `html` - The page HTML
/// * `config` - Thresholds for the word-count signal and the final verdict
///
/// # Example
///
/// ```
/// use quill_crawl::config::DetectorConfig;
/// use quill_crawl::detector::analyze_page_content;
///
/// let analysis = analyze_page_content(
///     "https://example.com/",
///     "<html><body><p>Welcome</p></body></html>",
///     &DetectorConfig::default(),
/// );
/// assert!(!analysis.is_article);
/// ```
pub fn analyze_page_content(url: &str, html: &str, config: &DetectorConfig) -> PageAnalysis {
    let document = Html::parse_document(html);

    let text = extract::extract_main_text(&document);
    let word_count = text.split_whitespace().count();

    let features = PageFeatures {
        url_path: Url::parse(url)
            .map(|u| u.path().to_string())
            .unwrap_or_default(),
        has_article_element: extract::has_article_element(&document),
        word_count,
        title: extract::extract_title(&document),
        published_at: extract::extract_published_date(&document, &text),
        author: extract::extract_author(&document),
        has_published_time_meta: extract::has_published_time_meta(&document),
        has_author_meta: extract::has_author_meta(&document),
        has_schema_article: extract::has_schema_article(html),
    };

    let (confidence, reasons) = score(&features, config);
    let is_article =
        confidence >= config.min_confidence && word_count >= config.min_article_words;

    let summary = extract::extract_summary(&document, &text);
    let content = if text.chars().count() > config.max_content_length {
        text.chars().take(config.max_content_length).collect()
    } else {
        text
    };

    PageAnalysis {
        is_article,
        confidence,
        title: features.title,
        content,
        published_at: features.published_at,
        author: features.author,
        summary,
        word_count,
        reasons,
    }
}
