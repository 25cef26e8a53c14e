//! End-to-end crawl cycles against a wiremock site

use crate::common::*;
use quill_crawl::state::{EntryStatus, SitemapStatus, SourceType};
use quill_crawl::storage::Storage;
use std::time::{Duration, Instant};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_sitemap_source_seeds_frontier() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(
        &server,
        &format!("User-agent: *\nAllow: /\nSitemap: {}/sitemap.xml\n", base),
    )
    .await;
    mount_html(&server, "/", &link_page("Home", &[])).await;

    let posts: Vec<String> = ["one", "two", "three"]
        .iter()
        .map(|slug| format!("{}/posts/{}", base, slug))
        .collect();
    mount_sitemap(&server, "/sitemap.xml", &posts).await;
    for slug in ["one", "two", "three"] {
        mount_html(&server, &format!("/posts/{}", slug), &link_page(slug, &[])).await;
    }

    let (mut engine, _dir) = test_engine();
    let id = engine.add_source(&base).unwrap();

    let results = engine.run_crawl_cycle().await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].pages_processed, 4);
    assert!(results[0].errors.is_empty());

    let storage = engine.storage();
    let source = storage.get_source(id).unwrap();
    assert_eq!(source.source_type, SourceType::Sitemap);
    assert!(source.last_checked_at.is_some());
    assert!(source.last_crawl_completed_at.is_some());

    let sitemaps = storage.get_sitemaps(id).unwrap();
    assert_eq!(sitemaps.len(), 1);
    assert_eq!(sitemaps[0].status, SitemapStatus::Fetched);
    assert_eq!(sitemaps[0].url_count, Some(3));

    let entries = storage.list_queue_entries(id).unwrap();
    assert_eq!(entries.len(), 4);
    assert_eq!(entries.iter().filter(|e| e.depth == 0).count(), 1);
    assert_eq!(entries.iter().filter(|e| e.depth == 1).count(), 3);
    assert!(entries.iter().all(|e| e.status == EntryStatus::Fetched));
    assert!(entries.iter().all(|e| e.fetch_count == 1));
}

#[tokio::test]
async fn test_article_created_once_across_crawls() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_html(
        &server,
        "/",
        &link_page("Home", &["/2024/05/my-post", "/about", "/logo.png", "https://other.example.org/x"]),
    )
    .await;
    mount_html(&server, "/2024/05/my-post", &article_page("Writing Crawlers", 250)).await;
    mount_html(&server, "/about", &link_page("About", &[])).await;

    let (mut engine, _dir) = test_engine();
    let id = engine.add_source(&base).unwrap();

    // Homepage only; its links land at depth 1
    let first = engine.run_crawl_cycle().await.unwrap();
    assert_eq!(first[0].pages_processed, 1);
    assert_eq!(first[0].links_discovered, 2);
    assert_eq!(first[0].articles_found, 0);

    let second = engine.run_crawl_cycle().await.unwrap();
    assert_eq!(second[0].pages_processed, 2);
    assert_eq!(second[0].articles_found, 1);

    let post_url = format!("{}/2024/05/my-post", base);
    let articles = engine.storage().list_articles(id).unwrap();
    assert_eq!(articles.len(), 1);
    assert_eq!(articles[0].url, post_url);
    assert_eq!(articles[0].external_id, post_url);
    assert_eq!(articles[0].title, "Writing Crawlers");
    assert_eq!(articles[0].author.as_deref(), Some("Jane Writer"));
    assert!(articles[0].published_at.is_some());
    assert!(articles[0].confidence >= 0.6);
    assert_eq!(articles[0].status, "NEW");

    let entry = engine
        .storage()
        .get_queue_entry_by_url(id, &post_url)
        .unwrap()
        .unwrap();
    assert_eq!(entry.status, EntryStatus::IsArticle);
    assert_eq!(entry.title.as_deref(), Some("Writing Crawlers"));
    assert_eq!(articles[0].crawl_queue_entry_id, Some(entry.id));

    // Crawl everything again from scratch; the article is not duplicated
    engine.reset_crawl_queue(id).unwrap();
    engine.run_crawl_cycle().await.unwrap();
    let again = engine.run_crawl_cycle().await.unwrap();
    assert_eq!(again[0].articles_found, 0);
    assert_eq!(engine.storage().count_articles(id).unwrap(), 1);

    let activity = engine.storage().recent_activity(50).unwrap();
    assert_eq!(
        activity
            .iter()
            .filter(|a| a.event_type == "article_discovered")
            .count(),
        1
    );
}

#[tokio::test]
async fn test_non_html_entry_is_skipped() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_html(&server, "/", &link_page("Home", &["/papers/annual-report"])).await;
    Mock::given(method("GET"))
        .and(path("/papers/annual-report"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"%PDF-1.4 fake".to_vec(), "application/pdf"),
        )
        .mount(&server)
        .await;

    let (mut engine, _dir) = test_engine();
    let id = engine.add_source(&base).unwrap();

    engine.run_crawl_cycle().await.unwrap();
    let results = engine.run_crawl_cycle().await.unwrap();
    assert_eq!(results[0].pages_processed, 1);
    assert_eq!(results[0].links_discovered, 0);
    assert!(results[0].errors.is_empty());

    let entry = engine
        .storage()
        .get_queue_entry_by_url(id, &format!("{}/papers/annual-report", base))
        .unwrap()
        .unwrap();
    assert_eq!(entry.status, EntryStatus::Skipped);
    assert!(entry
        .error_message
        .as_deref()
        .unwrap()
        .starts_with("Non-HTML content: application/pdf"));
    assert_eq!(engine.storage().count_articles(id).unwrap(), 0);
    assert_eq!(engine.storage().count_queue_entries(id).unwrap(), 2);
}

#[tokio::test]
async fn test_http_errors_mark_entries_failed() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_html(&server, "/", &link_page("Home", &["/gone"])).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let (mut engine, _dir) = test_engine();
    let id = engine.add_source(&base).unwrap();

    engine.run_crawl_cycle().await.unwrap();
    let results = engine.run_crawl_cycle().await.unwrap();
    assert_eq!(results[0].errors.len(), 1);

    let entry = engine
        .storage()
        .get_queue_entry_by_url(id, &format!("{}/gone", base))
        .unwrap()
        .unwrap();
    assert_eq!(entry.status, EntryStatus::Failed);
    assert_eq!(entry.error_message.as_deref(), Some("HTTP 410"));

    // Failed entries are not retried automatically
    let third = engine.run_crawl_cycle().await.unwrap();
    assert_eq!(third[0].pages_processed, 0);
}

#[tokio::test]
async fn test_robots_disallow_is_respected() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(
        &server,
        "User-agent: *\nDisallow: /private\nAllow: /private/public\n",
    )
    .await;
    mount_html(
        &server,
        "/",
        &link_page("Home", &["/private/secret", "/private/public/page"]),
    )
    .await;
    mount_html(&server, "/private/public/page", &link_page("Public", &[])).await;

    let (mut engine, _dir) = test_engine();
    let id = engine.add_source(&base).unwrap();
    engine.run_crawl_cycle().await.unwrap();

    let storage = engine.storage();
    assert!(storage
        .get_queue_entry_by_url(id, &format!("{}/private/secret", base))
        .unwrap()
        .is_none());
    assert!(storage
        .get_queue_entry_by_url(id, &format!("{}/private/public/page", base))
        .unwrap()
        .is_some());

    // An entry that slipped in before the rules were known is skipped unfetched
    let blocked = format!("{}/private/other", base);
    engine.storage_mut().enqueue_url(id, &blocked, 1).unwrap();
    engine.crawl_source(id).await.unwrap();

    let entry = engine
        .storage()
        .get_queue_entry_by_url(id, &blocked)
        .unwrap()
        .unwrap();
    assert_eq!(entry.status, EntryStatus::Skipped);
    assert_eq!(entry.error_message.as_deref(), Some("Disallowed by robots.txt"));
    assert_eq!(entry.fetch_count, 0);
}

#[tokio::test]
async fn test_depth_limit_holds() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_html(&server, "/", &link_page("Home", &["/level-one"])).await;
    mount_html(&server, "/level-one", &link_page("One", &["/level-two"])).await;
    mount_html(&server, "/level-two", &link_page("Two", &[])).await;

    let (mut engine, _dir) = test_engine_with(|config| config.crawler.max_depth = 1);
    let id = engine.add_source(&base).unwrap();

    for _ in 0..3 {
        engine.run_crawl_cycle().await.unwrap();
    }

    let entries = engine.storage().list_queue_entries(id).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.depth <= 1));
    assert!(engine
        .storage()
        .get_queue_entry_by_url(id, &format!("{}/level-two", base))
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_page_budget_caps_frontier() {
    let server = MockServer::start().await;
    let base = server.uri();

    let links: Vec<String> = (0..10).map(|i| format!("/post-{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_html(&server, "/", &link_page("Home", &link_refs)).await;

    let (mut engine, _dir) = test_engine_with(|config| config.crawler.max_pages_per_source = 3);
    let id = engine.add_source(&base).unwrap();

    let results = engine.run_crawl_cycle().await.unwrap();
    assert_eq!(results[0].links_discovered, 2);
    assert_eq!(engine.storage().count_queue_entries(id).unwrap(), 3);
}

#[tokio::test]
async fn test_run_budget_limits_pages_per_cycle() {
    let server = MockServer::start().await;
    let base = server.uri();

    let links: Vec<String> = (0..5).map(|i| format!("/post-{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();

    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_html(&server, "/", &link_page("Home", &link_refs)).await;
    for link in &links {
        mount_html(&server, link, &link_page("Post", &[])).await;
    }

    let (mut engine, _dir) = test_engine_with(|config| config.crawler.max_pages_per_run = 2);
    engine.add_source(&base).unwrap();

    engine.run_crawl_cycle().await.unwrap();
    let second = engine.run_crawl_cycle().await.unwrap();
    assert_eq!(second[0].pages_processed, 2);
    let third = engine.run_crawl_cycle().await.unwrap();
    assert_eq!(third[0].pages_processed, 2);
}

#[tokio::test]
async fn test_same_host_requests_are_spaced() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(
        &server,
        &format!("User-agent: *\nCrawl-delay: 0.2\nSitemap: {}/sitemap.xml\n", base),
    )
    .await;
    mount_html(&server, "/", &link_page("Home", &[])).await;
    let pages: Vec<String> = (0..3).map(|i| format!("{}/page-{}", base, i)).collect();
    mount_sitemap(&server, "/sitemap.xml", &pages).await;
    for i in 0..3 {
        mount_html(&server, &format!("/page-{}", i), &link_page("Page", &[])).await;
    }

    let (mut engine, _dir) = test_engine();
    let id = engine.add_source(&base).unwrap();
    engine.discover(id).await.unwrap();

    // The sitemap GET and four page GETs need at least four crawl-delay gaps
    let started = Instant::now();
    let result = engine.crawl_source(id).await.unwrap();
    assert_eq!(result.pages_processed, 4);
    assert!(started.elapsed() >= Duration::from_millis(800));
}

#[tokio::test]
async fn test_depth_is_kept_when_links_point_back() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(
        &server,
        &format!("User-agent: *\nSitemap: {}/sitemap.xml\n", base),
    )
    .await;
    mount_sitemap(&server, "/sitemap.xml", &[format!("{}/from-sitemap", base)]).await;
    mount_html(&server, "/", &link_page("Home", &["/hub"])).await;
    mount_html(&server, "/from-sitemap", &link_page("Listed", &[])).await;
    mount_html(&server, "/hub", &link_page("Hub", &["/leaf"])).await;
    mount_html(
        &server,
        "/leaf",
        &link_page("Leaf", &["/", "/hub", "/from-sitemap"]),
    )
    .await;

    let (mut engine, _dir) = test_engine();
    let id = engine.add_source(&base).unwrap();

    for _ in 0..3 {
        engine.run_crawl_cycle().await.unwrap();
    }
    // The leaf only links to known pages
    let last = engine.run_crawl_cycle().await.unwrap();
    assert_eq!(last[0].pages_processed, 0);

    let entry_at = |path: &str| {
        engine
            .storage()
            .get_queue_entry_by_url(id, &format!("{}{}", base, path))
            .unwrap()
            .unwrap()
    };
    assert_eq!(engine.storage().count_queue_entries(id).unwrap(), 4);
    assert_eq!(entry_at("").depth, 0);
    assert_eq!(entry_at("/from-sitemap").depth, 1);
    assert_eq!(entry_at("/hub").depth, 1);
    assert_eq!(entry_at("/leaf").depth, 2);

    // Re-linked pages keep their status and are not fetched again
    assert_eq!(entry_at("/from-sitemap").status, EntryStatus::Fetched);
    assert_eq!(entry_at("/from-sitemap").fetch_count, 1);
}

#[tokio::test]
async fn test_inactive_sources_are_not_crawled() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_html(&server, "/", &link_page("Home", &[])).await;

    let (mut engine, _dir) = test_engine();
    let id = engine.add_source(&base).unwrap();
    engine.deactivate_source(id).unwrap();

    let results = engine.run_crawl_cycle().await.unwrap();
    assert!(results.is_empty());

    // A forced crawl still works
    let forced = engine.crawl_source(id).await.unwrap();
    assert_eq!(forced.pages_processed, 1);
}

#[tokio::test]
async fn test_unreachable_source_does_not_stop_cycle() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_robots(&server, "User-agent: *\nAllow: /\n").await;
    mount_html(&server, "/", &link_page("Home", &[])).await;

    let (mut engine, _dir) = test_engine();
    // Unreachable host: every fetch fails, the entry ends FAILED
    let dead = engine.add_source("http://127.0.0.1:9").unwrap();
    let live = engine.add_source(&base).unwrap();

    let results = engine.run_crawl_cycle().await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].source_id, dead);
    assert_eq!(results[0].errors.len(), 1);
    assert_eq!(results[1].source_id, live);
    assert!(results[1].errors.is_empty());
}

#[tokio::test]
async fn test_reset_keeps_articles_and_reseeds() {
    let server = MockServer::start().await;
    let base = server.uri();

    mount_robots(
        &server,
        &format!("User-agent: *\nSitemap: {}/sitemap.xml\n", base),
    )
    .await;
    mount_html(&server, "/", &link_page("Home", &[])).await;
    mount_sitemap(&server, "/sitemap.xml", &[format!("{}/2024/05/my-post", base)]).await;
    mount_html(&server, "/2024/05/my-post", &article_page("Resettable", 250)).await;

    let (mut engine, _dir) = test_engine();
    let id = engine.add_source(&base).unwrap();
    engine.run_crawl_cycle().await.unwrap();
    assert_eq!(engine.storage().count_articles(id).unwrap(), 1);

    let removed = engine.reset_crawl_queue(id).unwrap();
    assert_eq!(removed, 2);
    assert_eq!(engine.storage().count_queue_entries(id).unwrap(), 0);
    assert_eq!(engine.storage().count_articles(id).unwrap(), 1);
    assert_eq!(
        engine.storage().get_pending_sitemaps(id).unwrap().len(),
        1
    );

    let article = &engine.storage().list_articles(id).unwrap()[0];
    assert_eq!(article.crawl_queue_entry_id, None);

    assert_eq!(engine.seed_crawl_queue(id).await.unwrap(), 2);

    let stats = engine.crawl_stats(id).unwrap();
    assert_eq!(stats.total_entries, 2);
    assert_eq!(stats.count(EntryStatus::Pending), 2);
    assert_eq!(stats.articles, 1);
}
