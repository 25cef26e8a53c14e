//! Article scoring signals
//!
//! Scoring is a fixed, ordered table. Each row adds its weight to the
//! confidence when its predicate holds; the sum is clamped to [0, 1].

use crate::config::DetectorConfig;
use crate::url::has_static_extension;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Word count that earns partial credit below `min_word_count`
pub const SHORT_ARTICLE_WORDS: usize = 100;

static ARTICLE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(/\d{4}/\d{1,2}/|/(blog|blogs|post|posts|article|articles|news|story|stories|essays?|writing|p)/[^/]+|\.html?$)",
    )
    .expect("static article path regex")
});

static NON_ARTICLE_PATH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(^/?$|/(tag|tags|category|categories|topics?|author|authors|archive|archives|page|search|about|contact|subscribe|privacy|privacy-policy|terms|terms-of-service|terms-of-use|legal|cookie-policy|cookies|disclaimer|imprint)(/|$))",
    )
    .expect("static non-article path regex")
});

/// Observations about a page that the signals test
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageFeatures {
    /// URL path, without query
    pub url_path: String,
    pub has_article_element: bool,
    pub word_count: usize,
    pub title: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub author: Option<String>,
    pub has_published_time_meta: bool,
    pub has_author_meta: bool,
    pub has_schema_article: bool,
}

impl PageFeatures {
    /// Last non-empty path segment
    pub fn last_segment(&self) -> &str {
        self.url_path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
    }
}

/// One row of the scoring table
pub struct Signal {
    pub name: &'static str,
    pub weight: f64,
    pub reason: &'static str,
    pub test: fn(&PageFeatures, &DetectorConfig) -> bool,
}

/// The scoring table, evaluated in order
pub static SIGNALS: &[Signal] = &[
    Signal {
        name: "article_url",
        weight: 0.15,
        reason: "URL path looks like an article",
        test: |f, _| ARTICLE_PATH.is_match(&f.url_path),
    },
    Signal {
        name: "slug",
        weight: 0.10,
        reason: "URL ends in a descriptive slug",
        test: |f, _| {
            let slug = f.last_segment();
            slug.chars().count() > 10 && slug.contains('-')
        },
    },
    Signal {
        name: "article_element",
        weight: 0.20,
        reason: "Page has an <article> element",
        test: |f, _| f.has_article_element,
    },
    Signal {
        name: "long_text",
        weight: 0.20,
        reason: "Substantial text content",
        test: |f, c| f.word_count >= c.min_word_count,
    },
    Signal {
        name: "medium_text",
        weight: 0.10,
        reason: "Moderate text content",
        test: |f, c| f.word_count < c.min_word_count && f.word_count >= SHORT_ARTICLE_WORDS,
    },
    Signal {
        name: "title",
        weight: 0.10,
        reason: "Has a descriptive title",
        test: |f, _| {
            f.title
                .as_ref()
                .map(|t| t.chars().count() > 10)
                .unwrap_or(false)
        },
    },
    Signal {
        name: "published_date",
        weight: 0.15,
        reason: "Has a publish date",
        test: |f, _| f.published_at.is_some(),
    },
    Signal {
        name: "byline",
        weight: 0.10,
        reason: "Has an author byline",
        test: |f, _| f.author.is_some(),
    },
    Signal {
        name: "published_time_meta",
        weight: 0.10,
        reason: "Declares article:published_time",
        test: |f, _| f.has_published_time_meta,
    },
    Signal {
        name: "author_meta",
        weight: 0.05,
        reason: "Declares an author meta tag",
        test: |f, _| f.has_author_meta,
    },
    Signal {
        name: "schema_article",
        weight: 0.15,
        reason: "Declares a schema.org article type",
        test: |f, _| f.has_schema_article,
    },
    Signal {
        name: "non_article_url",
        weight: -0.20,
        reason: "URL looks like a listing or utility page",
        test: |f, _| is_non_article_path(&f.url_path),
    },
];

/// Listing, legal and static-file paths
fn is_non_article_path(path: &str) -> bool {
    NON_ARTICLE_PATH.is_match(path) || has_static_extension(path)
}

/// Scores a page, returning the clamped confidence and the reasons that fired
pub fn score(features: &PageFeatures, config: &DetectorConfig) -> (f64, Vec<String>) {
    let mut total = 0.0;
    let mut reasons = Vec::new();

    for signal in SIGNALS {
        if (signal.test)(features, config) {
            total += signal.weight;
            reasons.push(signal.reason.to_string());
        }
    }

    (total.clamp(0.0, 1.0), reasons)
}
