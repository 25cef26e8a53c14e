//! Crawl engine - per-source crawl orchestration
//!
//! This module ties discovery, the persistent frontier and the article
//! detector together:
//! - Running discovery for sources that were never checked
//! - Seeding and draining each source's frontier in depth order
//! - Applying robots.txt and per-host politeness before every fetch
//! - Storing articles and enqueueing links from everything else

use crate::activity::{ActivityEvent, ActivitySink, EventType};
use crate::config::Config;
use crate::crawler::frontier::{self, link_filter_for, MAX_NEW_LINKS_PER_PAGE};
use crate::crawler::parser::parse_html;
use crate::crawler::politeness::PolitenessTracker;
use crate::crawler::{FetchResult, Fetcher};
use crate::detector::analyze_page_content;
use crate::discovery::{discover_source, DiscoveryResult};
use crate::output::{load_statistics, CrawlStats};
use crate::state::{EntryStatus, SourceType};
use crate::storage::{NewArticle, QueueEntry, SourceRecord, SqliteStorage, Storage};
use crate::url::{extract_domain, normalize_parsed, normalize_url};
use crate::{Result, UrlError};
use serde_json::json;
use tracing::{debug, error, info, warn};
use url::Url;

/// Outcome of crawling one source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CrawlResult {
    pub source_id: i64,
    /// Entries taken from the frontier, including skipped ones
    pub pages_processed: u32,
    /// Articles created by this crawl
    pub articles_found: u32,
    /// New frontier entries created from page links
    pub links_discovered: u32,
    /// One message per entry that ended FAILED
    pub errors: Vec<String>,
}

/// How a single entry ended
enum EntryOutcome {
    Skipped,
    Failed(String),
    Fetched { links_added: usize },
    Article { created: bool },
}

/// Main crawl engine
pub struct CrawlEngine {
    config: Config,
    storage: SqliteStorage,
    fetcher: Fetcher,
}

impl CrawlEngine {
    /// Creates a new engine over an opened store
    pub fn new(config: Config, storage: SqliteStorage) -> Result<Self> {
        let fetcher = Fetcher::new(&config.user_agent, &config.crawler)?;
        Ok(Self {
            config,
            storage,
            fetcher,
        })
    }

    /// Read access to the underlying store
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Write access to the underlying store
    pub fn storage_mut(&mut self) -> &mut SqliteStorage {
        &mut self.storage
    }

    /// The configuration this engine runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registers a source by home URL, returning its ID
    ///
    /// Registering the same normalized URL twice returns the existing ID.
    pub fn add_source(&mut self, home_url: &str) -> Result<i64> {
        let normalized = normalize_url(home_url)?;
        let id = self
            .storage
            .create_source(&normalized, SourceType::Homepage)?;
        info!("Registered source {} ({})", id, normalized);
        Ok(id)
    }

    /// Runs discovery for a source and stores the results
    ///
    /// Updates robots rules, discovered feed, type (unless the source is
    /// `custom`) and `last_checked_at`, and records each sitemap as PENDING.
    pub async fn discover(&mut self, source_id: i64) -> Result<DiscoveryResult> {
        let source = self.storage.get_source(source_id)?;
        let home = Url::parse(&source.home_url)?;

        let result =
            discover_source(&self.fetcher, &home, &self.config.user_agent.crawler_name).await;

        let source_type = if source.source_type == SourceType::Custom {
            SourceType::Custom
        } else {
            result.suggested_type
        };

        self.storage.record_discovery(
            source_id,
            &result.robots_rules,
            result.primary_feed(),
            source_type,
        )?;

        for (sitemap_url, sitemap_type) in &result.sitemaps {
            self.storage
                .upsert_sitemap(source_id, sitemap_url, *sitemap_type)?;
        }

        self.storage.log_event(
            ActivityEvent::new(
                EventType::SourceDiscovered,
                format!(
                    "Discovered {} as {} ({} feeds, {} sitemaps)",
                    source.home_url,
                    source_type,
                    result.feeds.len(),
                    result.sitemaps.len()
                ),
            )
            .for_entity("source", source_id)
            .with_metadata(json!({
                "feeds": result.feeds,
                "sitemaps": result.sitemaps.iter().map(|(url, _)| url).collect::<Vec<_>>(),
                "disallowedPaths": result.robots_rules.disallowed_paths.len(),
                "crawlDelaySeconds": result.robots_rules.crawl_delay_seconds,
            })),
        );

        Ok(result)
    }

    /// Re-runs discovery on operator request
    ///
    /// The frontier and the sitemap records are cleared first, so the next
    /// crawl reseeds from the fresh discovery. Articles are kept.
    pub async fn rediscover_source(&mut self, source_id: i64) -> Result<DiscoveryResult> {
        let source = self.storage.get_source(source_id)?;
        let removed = self.storage.clear_queue(source_id)?;
        let sitemaps = self.storage.clear_sitemaps(source_id)?;

        info!(
            "Re-discovering source {}: {} entries and {} sitemaps cleared",
            source_id, removed, sitemaps
        );
        self.storage.log_event(
            ActivityEvent::new(
                EventType::QueueReset,
                format!(
                    "Cleared crawl queue of {} for re-discovery ({} entries)",
                    source.home_url, removed
                ),
            )
            .for_entity("source", source_id)
            .with_metadata(json!({ "removed": removed, "sitemapsRemoved": sitemaps })),
        );

        self.discover(source_id).await
    }

    /// Seeds an empty frontier; returns the number of entries created
    pub async fn seed_crawl_queue(&mut self, source_id: i64) -> Result<u64> {
        let source = self.storage.get_source(source_id)?;
        let mut tracker = PolitenessTracker::new(self.config.crawler.request_delay());
        frontier::seed_crawl_queue(
            &mut self.storage,
            &self.fetcher,
            &source,
            &self.config.crawler,
            &mut tracker,
        )
        .await
    }

    /// Crawls every active source once, in ID order
    ///
    /// A failing source is logged and does not stop the cycle.
    pub async fn run_crawl_cycle(&mut self) -> Result<Vec<CrawlResult>> {
        let sources = self.storage.list_active_sources()?;
        info!("Starting crawl cycle over {} source(s)", sources.len());

        let mut tracker = PolitenessTracker::new(self.config.crawler.request_delay());
        let mut results = Vec::with_capacity(sources.len());

        for source in sources {
            match self.crawl_with_tracker(source.id, &mut tracker).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    error!("Crawl of source {} failed: {}", source.id, e);
                    self.storage.log_event(
                        ActivityEvent::new(
                            EventType::CrawlFailed,
                            format!("Crawl of {} failed: {}", source.home_url, e),
                        )
                        .for_entity("source", source.id),
                    );
                }
            }
        }

        info!("Crawl cycle finished: {} source(s) crawled", results.len());
        Ok(results)
    }

    /// Crawls one source now, whether or not it is active
    pub async fn crawl_source(&mut self, source_id: i64) -> Result<CrawlResult> {
        let mut tracker = PolitenessTracker::new(self.config.crawler.request_delay());
        self.crawl_with_tracker(source_id, &mut tracker).await
    }

    async fn crawl_with_tracker(
        &mut self,
        source_id: i64,
        tracker: &mut PolitenessTracker,
    ) -> Result<CrawlResult> {
        let mut source = self.storage.get_source(source_id)?;

        if source.last_checked_at.is_none() {
            self.discover(source_id).await?;
            source = self.storage.get_source(source_id)?;
        }

        self.storage.mark_crawl_started(source_id)?;
        self.storage.log_event(
            ActivityEvent::new(
                EventType::CrawlStarted,
                format!("Crawling {}", source.home_url),
            )
            .for_entity("source", source_id),
        );

        frontier::seed_crawl_queue(
            &mut self.storage,
            &self.fetcher,
            &source,
            &self.config.crawler,
            tracker,
        )
        .await?;

        let entries = self
            .storage
            .get_pending_entries(source_id, self.config.crawler.max_pages_per_run)?;
        debug!(
            "Source {}: {} pending entries this run",
            source_id,
            entries.len()
        );

        let mut result = CrawlResult {
            source_id,
            ..CrawlResult::default()
        };

        for entry in entries {
            result.pages_processed += 1;
            match self.process_entry(&source, &entry, tracker).await? {
                EntryOutcome::Skipped => {}
                EntryOutcome::Failed(message) => {
                    result.errors.push(format!("{}: {}", entry.url, message))
                }
                EntryOutcome::Fetched { links_added } => {
                    result.links_discovered += links_added as u32
                }
                EntryOutcome::Article { created } => {
                    if created {
                        result.articles_found += 1;
                    }
                }
            }
        }

        self.storage.mark_crawl_completed(source_id)?;
        self.storage.log_event(
            ActivityEvent::new(
                EventType::CrawlCompleted,
                format!(
                    "Crawled {}: {} pages, {} articles, {} new links, {} errors",
                    source.home_url,
                    result.pages_processed,
                    result.articles_found,
                    result.links_discovered,
                    result.errors.len()
                ),
            )
            .for_entity("source", source_id)
            .with_metadata(json!({
                "pagesProcessed": result.pages_processed,
                "articlesFound": result.articles_found,
                "linksDiscovered": result.links_discovered,
                "errors": result.errors.len(),
            })),
        );

        info!(
            "Source {} done: {} pages, {} articles, {} links, {} errors",
            source_id,
            result.pages_processed,
            result.articles_found,
            result.links_discovered,
            result.errors.len()
        );

        Ok(result)
    }

    /// Processes a single frontier entry
    ///
    /// Storage errors abort the source; fetch and page errors end the entry
    /// as FAILED.
    async fn process_entry(
        &mut self,
        source: &SourceRecord,
        entry: &QueueEntry,
        tracker: &mut PolitenessTracker,
    ) -> Result<EntryOutcome> {
        let (url, host) = match parse_with_host(&entry.url) {
            Ok(parsed) => parsed,
            Err(e) => {
                self.storage.transition_entry(
                    entry.id,
                    EntryStatus::Pending,
                    EntryStatus::Skipped,
                    None,
                    Some(&format!("Invalid URL: {}", e)),
                )?;
                return Ok(EntryOutcome::Skipped);
            }
        };

        let robots = source.robots_rules.as_ref();
        if self.config.crawler.respect_robots_txt {
            if let Some(rules) = robots {
                if !rules.is_url_allowed(&url) {
                    debug!("{} disallowed by robots.txt", entry.url);
                    self.storage.transition_entry(
                        entry.id,
                        EntryStatus::Pending,
                        EntryStatus::Skipped,
                        None,
                        Some("Disallowed by robots.txt"),
                    )?;
                    return Ok(EntryOutcome::Skipped);
                }
            }
        }

        self.storage.claim_entry(entry.id)?;

        tracker
            .wait_for(&host, robots.and_then(|rules| rules.crawl_delay()))
            .await;

        match self.fetcher.fetch_page(&entry.url).await {
            FetchResult::Success {
                final_url, body, ..
            } => match self.handle_page(source, entry, &final_url, &body) {
                Ok(outcome) => Ok(outcome),
                Err(e) => self.fail_entry(entry, e.to_string()),
            },

            FetchResult::ContentMismatch { content_type } => {
                debug!("{} is not HTML ({})", entry.url, content_type);
                self.storage.transition_entry(
                    entry.id,
                    EntryStatus::Fetching,
                    EntryStatus::Skipped,
                    None,
                    Some(&format!("Non-HTML content: {}", content_type)),
                )?;
                Ok(EntryOutcome::Skipped)
            }

            FetchResult::HttpError { status_code } => {
                self.fail_entry(entry, format!("HTTP {}", status_code))
            }

            FetchResult::NetworkError { error } => self.fail_entry(entry, error),
        }
    }

    fn handle_page(
        &mut self,
        source: &SourceRecord,
        entry: &QueueEntry,
        final_url: &str,
        body: &str,
    ) -> Result<EntryOutcome> {
        let analysis = analyze_page_content(&entry.url, body, &self.config.detector);

        if analysis.is_article {
            let title = analysis
                .title
                .clone()
                .unwrap_or_else(|| entry.url.clone());

            let article = NewArticle {
                source_id: source.id,
                url: entry.url.clone(),
                title: title.clone(),
                raw_summary: analysis.summary.clone(),
                raw_content: analysis.content.clone(),
                published_at: analysis.published_at.map(|dt| dt.to_rfc3339()),
                author: analysis.author.clone(),
                confidence: analysis.confidence,
                crawl_queue_entry_id: Some(entry.id),
            };

            match self.storage.insert_article(&article) {
                Ok(created) => {
                    if let Some(article_id) = created {
                        info!(
                            "Article found: {} ({:.2})",
                            entry.url, analysis.confidence
                        );
                        self.storage.log_event(
                            ActivityEvent::new(
                                EventType::ArticleDiscovered,
                                format!("New article: {}", title),
                            )
                            .for_entity("article", article_id)
                            .with_metadata(json!({
                                "sourceId": source.id,
                                "url": entry.url,
                                "confidence": analysis.confidence,
                                "reasons": analysis.reasons,
                            })),
                        );
                    }
                    self.storage.transition_entry(
                        entry.id,
                        EntryStatus::Fetching,
                        EntryStatus::IsArticle,
                        Some(&title),
                        None,
                    )?;
                    return Ok(EntryOutcome::Article {
                        created: created.is_some(),
                    });
                }
                Err(e) => {
                    warn!("Failed to store article {}: {}", entry.url, e);
                    self.storage.transition_entry(
                        entry.id,
                        EntryStatus::Fetching,
                        EntryStatus::Fetched,
                        Some(&title),
                        None,
                    )?;
                    return Ok(EntryOutcome::Fetched { links_added: 0 });
                }
            }
        }

        let base = Url::parse(final_url).or_else(|_| Url::parse(&entry.url))?;
        let parsed = parse_html(body, &base);

        let links_added = if entry.depth < self.config.crawler.max_depth {
            let filter = link_filter_for(source, &self.config.crawler)?;
            let eligible = filter.accept_all(&parsed.links);
            frontier::enqueue_urls(
                &mut self.storage,
                source.id,
                &eligible,
                entry.depth + 1,
                MAX_NEW_LINKS_PER_PAGE,
                &self.config.crawler,
            )?
        } else {
            0
        };

        let title = parsed.title.or(analysis.title);
        self.storage.transition_entry(
            entry.id,
            EntryStatus::Fetching,
            EntryStatus::Fetched,
            title.as_deref(),
            None,
        )?;

        debug!("{} fetched, {} new links", entry.url, links_added);
        Ok(EntryOutcome::Fetched { links_added })
    }

    fn fail_entry(&mut self, entry: &QueueEntry, message: String) -> Result<EntryOutcome> {
        warn!("Fetch of {} failed: {}", entry.url, message);
        self.storage.transition_entry(
            entry.id,
            EntryStatus::Fetching,
            EntryStatus::Failed,
            None,
            Some(&message),
        )?;
        Ok(EntryOutcome::Failed(message))
    }

    /// Frontier and article counts for a source
    pub fn crawl_stats(&self, source_id: i64) -> Result<CrawlStats> {
        load_statistics(&self.storage, source_id)
    }

    /// Clears a source's frontier so the next crawl reseeds it
    ///
    /// Articles are kept; sitemaps go back to PENDING. Returns the number of
    /// entries removed.
    pub fn reset_crawl_queue(&mut self, source_id: i64) -> Result<u64> {
        let source = self.storage.get_source(source_id)?;
        let removed = self.storage.clear_queue(source_id)?;
        self.storage.reset_sitemaps(source_id)?;

        info!("Reset frontier of source {}: {} entries removed", source_id, removed);
        self.storage.log_event(
            ActivityEvent::new(
                EventType::QueueReset,
                format!("Reset crawl queue of {} ({} entries)", source.home_url, removed),
            )
            .for_entity("source", source_id)
            .with_metadata(json!({ "removed": removed })),
        );
        Ok(removed)
    }

    /// Stops a source from taking part in crawl cycles
    pub fn deactivate_source(&mut self, source_id: i64) -> Result<()> {
        self.storage.set_source_active(source_id, false)?;
        Ok(())
    }
}

/// Parses a frontier URL, requiring an http(s) scheme and a host
fn parse_with_host(raw: &str) -> Result<(Url, String)> {
    let mut url = Url::parse(raw)?;
    normalize_parsed(&mut url)?;
    let host = extract_domain(&url).ok_or(UrlError::MissingDomain)?;
    Ok((url, host))
}
