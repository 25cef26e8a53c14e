//! Source discovery and frontier seeding

use crate::common::*;
use quill_crawl::state::{SitemapStatus, SitemapType, SourceType};
use quill_crawl::storage::Storage;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_advertised_feed_wins() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nDisallow: /drafts\nCrawl-delay: 2\n").await;
    mount_html(
        &server,
        "/",
        r#"<html><head>
            <link rel="alternate" type="application/rss+xml" href="/index.xml">
        </head><body>Hi</body></html>"#,
    )
    .await;

    let (mut engine, _dir) = test_engine();
    let id = engine.add_source(&base).unwrap();
    let result = engine.discover(id).await.unwrap();

    let feed = format!("{}/index.xml", base);
    assert_eq!(result.feeds, vec![feed.clone()]);
    assert_eq!(result.suggested_type, SourceType::Feed);

    let source = engine.storage().get_source(id).unwrap();
    assert_eq!(source.source_type, SourceType::Feed);
    assert_eq!(source.discovered_feed_url.as_deref(), Some(feed.as_str()));
    let rules = source.robots_rules.unwrap();
    assert_eq!(rules.disallowed_paths, vec!["/drafts".to_string()]);
    assert_eq!(rules.crawl_delay_seconds, Some(2.0));
}

#[tokio::test]
async fn test_probed_feed_path() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_html(&server, "/", &link_page("Home", &[])).await;
    Mock::given(method("HEAD"))
        .and(path("/rss"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("content-type", "application/rss+xml"),
        )
        .mount(&server)
        .await;

    let (mut engine, _dir) = test_engine();
    let id = engine.add_source(&base).unwrap();
    let result = engine.discover(id).await.unwrap();

    assert_eq!(result.feeds, vec![format!("{}/rss", base)]);
    // No robots.txt: everything allowed
    assert!(result.robots_rules.is_permissive());
}

#[tokio::test]
async fn test_bare_homepage_source() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_html(&server, "/", &link_page("Home", &[])).await;

    let (mut engine, _dir) = test_engine();
    let id = engine.add_source(&base).unwrap();
    let result = engine.discover(id).await.unwrap();

    assert!(result.feeds.is_empty());
    assert!(result.sitemaps.is_empty());
    assert_eq!(result.suggested_type, SourceType::Homepage);
    assert!(engine.storage().get_source(id).unwrap().last_checked_at.is_some());
}

#[tokio::test]
async fn test_probed_sitemap_is_recorded() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_html(&server, "/", &link_page("Home", &[])).await;
    Mock::given(method("HEAD"))
        .and(path("/news-sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "application/xml"))
        .mount(&server)
        .await;

    let (mut engine, _dir) = test_engine();
    let id = engine.add_source(&base).unwrap();
    engine.discover(id).await.unwrap();

    let sitemaps = engine.storage().get_sitemaps(id).unwrap();
    assert_eq!(sitemaps.len(), 1);
    assert_eq!(sitemaps[0].sitemap_type, SitemapType::News);
    assert_eq!(sitemaps[0].status, SitemapStatus::Pending);
    assert_eq!(
        engine.storage().get_source(id).unwrap().source_type,
        SourceType::Sitemap
    );
}

#[tokio::test]
async fn test_custom_source_type_survives_discovery() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_html(
        &server,
        "/",
        r#"<html><head><link rel="alternate" type="application/atom+xml" href="/atom"></head></html>"#,
    )
    .await;

    let (mut engine, _dir) = test_engine();
    let id = engine
        .storage_mut()
        .create_source(&base, SourceType::Custom)
        .unwrap();
    engine.discover(id).await.unwrap();

    let source = engine.storage().get_source(id).unwrap();
    assert_eq!(source.source_type, SourceType::Custom);
    assert_eq!(
        source.discovered_feed_url,
        Some(format!("{}/atom", base))
    );
}

#[tokio::test]
async fn test_seeding_is_idempotent() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, &format!("Sitemap: {}/sitemap.xml\n", base)).await;
    mount_html(&server, "/", &link_page("Home", &[])).await;
    let urls = vec![
        format!("{}/a", base),
        format!("{}/b", base),
        format!("{}/b/", base),
        format!("{}/logo.png", base),
        "https://elsewhere.example.org/c".to_string(),
    ];
    mount_sitemap(&server, "/sitemap.xml", &urls).await;

    let (mut engine, _dir) = test_engine();
    let id = engine.add_source(&base).unwrap();
    engine.discover(id).await.unwrap();

    assert_eq!(engine.seed_crawl_queue(id).await.unwrap(), 3);
    assert_eq!(engine.seed_crawl_queue(id).await.unwrap(), 0);
    assert_eq!(engine.storage().count_queue_entries(id).unwrap(), 3);

    let sitemap = &engine.storage().get_sitemaps(id).unwrap()[0];
    assert_eq!(sitemap.status, SitemapStatus::Fetched);
    assert_eq!(sitemap.url_count, Some(5));
}

#[tokio::test]
async fn test_failed_sitemap_is_recorded() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, &format!("Sitemap: {}/sitemap.xml\n", base)).await;
    mount_html(&server, "/", &link_page("Home", &[])).await;
    Mock::given(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let (mut engine, _dir) = test_engine();
    let id = engine.add_source(&base).unwrap();
    let results = engine.run_crawl_cycle().await.unwrap();
    assert_eq!(results[0].pages_processed, 1);

    let sitemap = &engine.storage().get_sitemaps(id).unwrap()[0];
    assert_eq!(sitemap.status, SitemapStatus::Failed);
    assert!(sitemap.error_message.is_some());

    let activity = engine.storage().recent_activity(20).unwrap();
    assert!(activity.iter().any(|a| a.event_type == "sitemap_failed"));
}

#[tokio::test]
async fn test_rediscover_picks_up_new_sitemap() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_html(&server, "/", &link_page("Home", &["/one", "/two"])).await;

    let (mut engine, _dir) = test_engine();
    let id = engine.add_source(&base).unwrap();
    engine.run_crawl_cycle().await.unwrap();
    assert_eq!(engine.storage().count_queue_entries(id).unwrap(), 3);
    assert_eq!(
        engine.storage().get_source(id).unwrap().source_type,
        SourceType::Homepage
    );

    server.reset().await;
    mount_robots(&server, &format!("Sitemap: {}/sitemap.xml\n", base)).await;
    mount_html(&server, "/", &link_page("Home", &[])).await;
    mount_sitemap(&server, "/sitemap.xml", &[format!("{}/fresh", base)]).await;
    mount_html(&server, "/fresh", &link_page("Fresh", &[])).await;

    let result = engine.rediscover_source(id).await.unwrap();
    assert_eq!(result.suggested_type, SourceType::Sitemap);

    // Old frontier is gone; only the fresh sitemap is recorded
    assert_eq!(engine.storage().count_queue_entries(id).unwrap(), 0);
    let source = engine.storage().get_source(id).unwrap();
    assert_eq!(source.source_type, SourceType::Sitemap);
    let sitemaps = engine.storage().get_sitemaps(id).unwrap();
    assert_eq!(sitemaps.len(), 1);
    assert_eq!(sitemaps[0].status, SitemapStatus::Pending);

    // The next cycle reseeds from the home URL and the new sitemap
    let results = engine.run_crawl_cycle().await.unwrap();
    assert_eq!(results[0].pages_processed, 2);
    assert!(engine
        .storage()
        .get_queue_entry_by_url(id, &format!("{}/fresh", base))
        .unwrap()
        .is_some());
    assert!(engine
        .storage()
        .get_queue_entry_by_url(id, &format!("{}/one", base))
        .unwrap()
        .is_none());
    assert_eq!(
        engine.storage().get_sitemaps(id).unwrap()[0].status,
        SitemapStatus::Fetched
    );
}

#[tokio::test]
async fn test_rediscover_drops_vanished_sitemaps() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_robots(&server, &format!("Sitemap: {}/old-sitemap.xml\n", base)).await;
    mount_html(&server, "/", &link_page("Home", &[])).await;

    let (mut engine, _dir) = test_engine();
    let id = engine.add_source(&base).unwrap();
    engine.discover(id).await.unwrap();
    assert_eq!(engine.storage().get_sitemaps(id).unwrap().len(), 1);

    server.reset().await;
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_html(&server, "/", &link_page("Home", &[])).await;

    engine.rediscover_source(id).await.unwrap();
    assert!(engine.storage().get_sitemaps(id).unwrap().is_empty());
    assert_eq!(
        engine.storage().get_source(id).unwrap().source_type,
        SourceType::Homepage
    );
}
