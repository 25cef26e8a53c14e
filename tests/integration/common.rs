//! Shared fixtures for integration tests

use quill_crawl::config::{Config, CrawlerConfig, DetectorConfig, OutputConfig, UserAgentConfig};
use quill_crawl::storage::open_storage;
use quill_crawl::CrawlEngine;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with a short request delay
pub fn test_config(db_path: &str) -> Config {
    Config {
        crawler: CrawlerConfig {
            request_delay_ms: 10,
            timeout_ms: 5_000,
            ..CrawlerConfig::default()
        },
        detector: DetectorConfig::default(),
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
        },
        output: OutputConfig {
            database_path: db_path.to_string(),
        },
    }
}

/// Builds an engine over a fresh database, letting the caller tweak config
pub fn test_engine_with(tweak: impl FnOnce(&mut Config)) -> (CrawlEngine, TempDir) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("quill.db");
    let mut config = test_config(db_path.to_str().expect("utf-8 temp path"));
    tweak(&mut config);

    let storage = open_storage(&db_path).expect("Failed to open storage");
    let engine = CrawlEngine::new(config, storage).expect("Failed to build engine");
    (engine, dir)
}

pub fn test_engine() -> (CrawlEngine, TempDir) {
    test_engine_with(|_| {})
}

pub async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

pub async fn mount_html(server: &MockServer, url_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html"))
        .mount(server)
        .await;
}

pub async fn mount_sitemap(server: &MockServer, url_path: &str, urls: &[String]) {
    Mock::given(method("GET"))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(200).set_body_raw(urlset(urls), "application/xml"))
        .mount(server)
        .await;
}

pub fn urlset(urls: &[String]) -> String {
    let entries: String = urls
        .iter()
        .map(|url| format!("<url><loc>{}</loc></url>", url))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        entries
    )
}

/// A short page with the given links and no article markers
pub fn link_page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a> "#, href, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><p>Welcome</p>{}</body></html>",
        title, anchors
    )
}

/// A blog post with article markup, a date, an author and `words` words
pub fn article_page(title: &str, words: usize) -> String {
    let text = (0..words)
        .map(|i| format!("word{}", i))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        r#"<html><head>
            <title>{title} | Test Blog</title>
            <meta name="author" content="Jane Writer">
        </head><body>
            <nav><a href="/">Home</a></nav>
            <article>
                <h1>{title}</h1>
                <time datetime="2024-05-02T08:00:00Z">May 2, 2024</time>
                <p>{text}</p>
            </article>
        </body></html>"#
    )
}
