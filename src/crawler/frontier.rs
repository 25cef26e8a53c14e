//! Frontier seeding and budgeted link enqueueing
//!
//! Every insert into the crawl queue goes through this module so that the
//! per-source page budget and the depth limit hold no matter where URLs
//! come from.

use crate::activity::{ActivityEvent, ActivitySink, EventType};
use crate::config::CrawlerConfig;
use crate::crawler::politeness::PolitenessTracker;
use crate::crawler::Fetcher;
use crate::discovery::{parse_sitemap, SitemapDocument};
use crate::storage::{SitemapRecord, SourceRecord, Storage, StorageResult};
use crate::url::{extract_domain, normalize_url, LinkFilter};
use crate::{QuillError, Result};
use serde_json::json;
use tracing::{debug, info, warn};
use url::Url;

/// Newly inserted links accepted from a single page
pub const MAX_NEW_LINKS_PER_PAGE: usize = 50;

/// URLs taken from a single sitemap while seeding
pub const MAX_SITEMAP_URLS: usize = 200;

/// Entries a source may still gain before reaching `max_pages_per_source`
pub fn remaining_budget<S: Storage>(
    storage: &S,
    source_id: i64,
    config: &CrawlerConfig,
) -> StorageResult<u64> {
    let used = storage.count_queue_entries(source_id)?;
    Ok(u64::from(config.max_pages_per_source).saturating_sub(used))
}

/// Enqueues already-filtered URLs at `depth`, stopping at `cap` new entries
///
/// URLs already queued do not count against the cap. Returns the number of
/// entries created.
pub fn enqueue_urls<S: Storage>(
    storage: &mut S,
    source_id: i64,
    urls: &[String],
    depth: u32,
    cap: usize,
    config: &CrawlerConfig,
) -> StorageResult<usize> {
    if depth > config.max_depth {
        return Ok(0);
    }

    let budget = remaining_budget(storage, source_id, config)?;
    let cap = cap.min(usize::try_from(budget).unwrap_or(usize::MAX));

    let mut added = 0;
    for url in urls {
        if added >= cap {
            break;
        }
        if storage.enqueue_url(source_id, url, depth)? {
            added += 1;
        }
    }

    Ok(added)
}

/// Builds the eligibility filter for a source
pub fn link_filter_for(source: &SourceRecord, config: &CrawlerConfig) -> Result<LinkFilter> {
    let home = Url::parse(&source.home_url)?;
    let robots = if config.respect_robots_txt {
        source.robots_rules.clone()
    } else {
        None
    };
    Ok(LinkFilter::new(&home, robots))
}

/// Seeds an empty frontier from the home URL and pending sitemaps
///
/// Does nothing when the source already has queue entries. Sitemap fetches
/// go through `tracker` like page fetches do. Returns the number of entries
/// created.
pub async fn seed_crawl_queue<S>(
    storage: &mut S,
    fetcher: &Fetcher,
    source: &SourceRecord,
    config: &CrawlerConfig,
    tracker: &mut PolitenessTracker,
) -> Result<u64>
where
    S: Storage + ActivitySink,
{
    if storage.count_queue_entries(source.id)? > 0 {
        debug!("Frontier for source {} already seeded", source.id);
        return Ok(0);
    }

    let home = normalize_url(&source.home_url)?;
    let mut added = u64::from(storage.enqueue_url(source.id, &home, 0)?);

    let filter = link_filter_for(source, config)?;
    for sitemap in storage.get_pending_sitemaps(source.id)? {
        let crawl_delay = source
            .robots_rules
            .as_ref()
            .and_then(|rules| rules.crawl_delay());
        if let Some(host) = Url::parse(&sitemap.sitemap_url)
            .ok()
            .as_ref()
            .and_then(extract_domain)
        {
            tracker.wait_for(&host, crawl_delay).await;
        }

        match seed_from_sitemap(storage, fetcher, source.id, &sitemap, &filter, config).await {
            Ok(count) => added += count as u64,
            Err(e) => {
                warn!("Sitemap {} failed: {}", sitemap.sitemap_url, e);
                storage.mark_sitemap_failed(sitemap.id, &e.to_string())?;
                storage.log_event(
                    ActivityEvent::new(
                        EventType::SitemapFailed,
                        format!("Sitemap {} failed: {}", sitemap.sitemap_url, e),
                    )
                    .for_entity("sitemap", sitemap.id)
                    .with_metadata(json!({ "sourceId": source.id })),
                );
            }
        }
    }

    info!("Seeded source {} with {} entries", source.id, added);
    Ok(added)
}

async fn seed_from_sitemap<S: Storage>(
    storage: &mut S,
    fetcher: &Fetcher,
    source_id: i64,
    sitemap: &SitemapRecord,
    filter: &LinkFilter,
    config: &CrawlerConfig,
) -> Result<usize> {
    let body = fetcher.get_text(&sitemap.sitemap_url).await?;
    let document = parse_sitemap(&body).map_err(|message| QuillError::SitemapParse {
        url: sitemap.sitemap_url.clone(),
        message,
    })?;

    let urls = match document {
        SitemapDocument::Index(children) => {
            debug!(
                "Sitemap index {} lists {} sitemaps; not recursing",
                sitemap.sitemap_url,
                children.len()
            );
            storage.mark_sitemap_fetched(sitemap.id, 0)?;
            return Ok(0);
        }
        SitemapDocument::UrlSet(urls) => urls,
    };

    let loc_count = u32::try_from(urls.len()).unwrap_or(u32::MAX);
    let added = if config.max_depth == 0 {
        0
    } else {
        let eligible = filter.accept_all(&urls);
        enqueue_urls(storage, source_id, &eligible, 1, MAX_SITEMAP_URLS, config)?
    };

    storage.mark_sitemap_fetched(sitemap.id, loc_count)?;
    debug!(
        "Sitemap {} listed {} URLs, {} queued",
        sitemap.sitemap_url, loc_count, added
    );
    Ok(added)
}
