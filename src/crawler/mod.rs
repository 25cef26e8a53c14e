//! Crawler module for fetching and processing source pages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with content-type gating
//! - HTML parsing and link extraction
//! - Frontier seeding and budgeted enqueueing
//! - Per-host politeness
//! - Per-source crawl orchestration

mod engine;
mod fetcher;
mod frontier;
mod parser;
mod politeness;

pub use engine::{CrawlEngine, CrawlResult};
pub use fetcher::{build_http_client, is_html_content_type, FetchResult, Fetcher, HeadResponse};
pub use frontier::{
    enqueue_urls, link_filter_for, remaining_budget, seed_crawl_queue, MAX_NEW_LINKS_PER_PAGE,
    MAX_SITEMAP_URLS,
};
pub use parser::{parse_html, ParsedPage};
pub use politeness::{effective_delay, PolitenessTracker};
