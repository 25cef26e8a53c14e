//! Field extraction from article candidates
//!
//! Everything here reads an already-parsed [`Html`] document and returns
//! plain values; scoring happens in [`super::signals`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

/// Content containers, most specific first
const CONTENT_SELECTORS: &[&str] = &[
    "article",
    "[role='article']",
    "main",
    "[role='main']",
    ".post-content",
    ".entry-content",
    ".article-content",
    ".article-body",
    ".post-body",
    "#content",
    ".content",
];

/// Elements whose whole subtree is never article text
const BOILERPLATE_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "script", "style", "noscript", "form", "iframe", "svg",
    "button", "template",
];

/// Length of a summary cut from body text
const SUMMARY_CHARS: usize = 300;

static BOILERPLATE_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(^|[\s_-])(ads?|advert\w*|sponsor\w*|promo|comments?|disqus|sidebar|widget|share|sharing|social|related|newsletter|subscribe|cookie\w*|popup|breadcrumbs?)($|[\s_-])",
    )
    .expect("static boilerplate regex")
});

static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("static date regex"));

static LONG_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec)\.? \d{1,2}, \d{4}\b",
    )
    .expect("static date regex")
});

static SCHEMA_ARTICLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"schema\.org/(Article|BlogPosting|NewsArticle)\b|"@type"\s*:\s*"(Article|BlogPosting|NewsArticle)""#,
    )
    .expect("static schema regex")
});

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Returns the `content` attribute of the first matching `<meta>`
pub fn meta_content(document: &Html, css: &str) -> Option<String> {
    let selector = selector(css)?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(collapse_whitespace)
        .find(|s| !s.is_empty())
}

fn first_text(document: &Html, css: &str) -> Option<String> {
    let selector = selector(css)?;
    document
        .select(&selector)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|s| !s.is_empty())
}

/// Title: `og:title`, else the first `<h1>`, else `<title>`
pub fn extract_title(document: &Html) -> Option<String> {
    meta_content(document, "meta[property='og:title']")
        .or_else(|| first_text(document, "h1"))
        .or_else(|| first_text(document, "title"))
}

/// Author from meta tags or a visible byline
pub fn extract_author(document: &Html) -> Option<String> {
    let from_meta = meta_content(document, "meta[name='author']").or_else(|| {
        meta_content(document, "meta[property='article:author']")
            .filter(|value| !value.starts_with("http"))
    });

    from_meta
        .or_else(|| {
            [
                "[rel='author']",
                "[itemprop='author']",
                ".byline",
                ".author-name",
                ".author",
            ]
            .iter()
            .find_map(|css| first_text(document, css))
        })
        .map(|author| {
            let trimmed = author.trim();
            trimmed
                .strip_prefix("By ")
                .or_else(|| trimmed.strip_prefix("by "))
                .unwrap_or(trimmed)
                .trim()
                .to_string()
        })
        .filter(|author| !author.is_empty() && author.chars().count() <= 100)
}

/// True if the document carries `meta[name=author]`
pub fn has_author_meta(document: &Html) -> bool {
    meta_content(document, "meta[name='author']").is_some()
}

/// True if the document carries `article:published_time`
pub fn has_published_time_meta(document: &Html) -> bool {
    meta_content(document, "meta[property='article:published_time']").is_some()
}

/// True if the document has an `<article>` or `[role=article]` element
pub fn has_article_element(document: &Html) -> bool {
    selector("article, [role='article']")
        .map(|s| document.select(&s).next().is_some())
        .unwrap_or(false)
}

/// True if the raw HTML declares a schema.org article type
pub fn has_schema_article(html: &str) -> bool {
    SCHEMA_ARTICLE.is_match(html)
}

/// Publish date from meta tags, `<time>`, or a date written in the text
pub fn extract_published_date(document: &Html, text: &str) -> Option<DateTime<Utc>> {
    let meta_candidates = [
        "meta[property='article:published_time']",
        "meta[itemprop='datePublished']",
        "meta[name='date']",
        "meta[name='pubdate']",
        "meta[name='publish-date']",
    ];

    meta_candidates
        .iter()
        .filter_map(|css| meta_content(document, css))
        .find_map(|value| parse_date(&value))
        .or_else(|| {
            let time = selector("time")?;
            document.select(&time).find_map(|el| {
                el.value()
                    .attr("datetime")
                    .and_then(parse_date)
                    .or_else(|| parse_date(el.text().collect::<String>().trim()))
            })
        })
        .or_else(|| {
            ISO_DATE
                .find_iter(text)
                .chain(LONG_DATE.find_iter(text))
                .find_map(|m| parse_date(m.as_str()))
        })
}

/// Parses the date formats commonly seen on blogs
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    let cleaned = value.replace('.', "");
    for format in ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|naive| Utc.from_utc_datetime(&naive));
        }
    }

    None
}

/// Summary: meta or OG description, else the start of the text
pub fn extract_summary(document: &Html, text: &str) -> Option<String> {
    meta_content(document, "meta[name='description']")
        .or_else(|| meta_content(document, "meta[property='og:description']"))
        .or_else(|| {
            let cut: String = text.chars().take(SUMMARY_CHARS).collect();
            let cut = cut.trim().to_string();
            (!cut.is_empty()).then_some(cut)
        })
}

/// Main text of the page with boilerplate removed
///
/// The first content container that yields any text wins; `<body>` is the
/// fallback.
pub fn extract_main_text(document: &Html) -> String {
    for css in CONTENT_SELECTORS {
        let Some(selector) = selector(css) else {
            continue;
        };
        if let Some(container) = document.select(&selector).next() {
            let text = visible_text(container);
            if !text.is_empty() {
                return text;
            }
        }
    }

    selector("body")
        .and_then(|body| document.select(&body).next())
        .map(visible_text)
        .unwrap_or_default()
}

fn visible_text(root: ElementRef) -> String {
    let mut parts = Vec::new();
    collect_text(root, &mut parts);
    collapse_whitespace(&parts.join(" "))
}

fn collect_text<'a>(element: ElementRef<'a>, parts: &mut Vec<&'a str>) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => parts.push(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    if !is_boilerplate(&child) {
                        collect_text(child, parts);
                    }
                }
            }
            _ => {}
        }
    }
}

fn is_boilerplate(element: &ElementRef) -> bool {
    let value = element.value();
    if BOILERPLATE_TAGS.contains(&value.name()) {
        return true;
    }

    let class = value.attr("class").unwrap_or("");
    let id = value.attr("id").unwrap_or("");
    BOILERPLATE_MARKER.is_match(class) || BOILERPLATE_MARKER.is_match(id)
}
