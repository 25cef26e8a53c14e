//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the engine, including:
//! - SQLite database initialization and schema management
//! - Sources and their discovery snapshots
//! - The per-source crawl frontier and its status transitions
//! - Discovered sitemaps, articles and the activity log

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::robots::RobotsRules;
use crate::state::{EntryStatus, SitemapStatus, SitemapType, SourceType};
use crate::QuillError;
use chrono::{SecondsFormat, Utc};

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
pub fn open_storage(path: &Path) -> Result<SqliteStorage, QuillError> {
    SqliteStorage::new(path)
}

/// Current time as an RFC 3339 UTC string with microsecond precision
///
/// The fixed precision keeps stored timestamps lexicographically ordered.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Represents a registered source
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub id: i64,
    pub home_url: String,
    pub discovered_feed_url: Option<String>,
    pub source_type: SourceType,
    pub active: bool,
    pub robots_rules: Option<RobotsRules>,
    pub last_checked_at: Option<String>,
    pub last_crawl_started_at: Option<String>,
    pub last_crawl_completed_at: Option<String>,
    pub created_at: String,
}

/// Represents one crawl frontier entry
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub id: i64,
    pub source_id: i64,
    pub url: String,
    pub depth: u32,
    pub status: EntryStatus,
    pub discovered_at: String,
    pub last_tried_at: Option<String>,
    pub fetch_count: u32,
    pub error_message: Option<String>,
    pub title: Option<String>,
}

/// Represents a sitemap found by discovery
#[derive(Debug, Clone)]
pub struct SitemapRecord {
    pub id: i64,
    pub source_id: i64,
    pub sitemap_url: String,
    pub sitemap_type: SitemapType,
    pub status: SitemapStatus,
    pub url_count: Option<u32>,
    pub error_message: Option<String>,
}

/// Fields required to create an article
#[derive(Debug, Clone)]
pub struct NewArticle {
    pub source_id: i64,
    pub url: String,
    pub title: String,
    pub raw_summary: Option<String>,
    pub raw_content: String,
    pub published_at: Option<String>,
    pub author: Option<String>,
    pub confidence: f64,
    pub crawl_queue_entry_id: Option<i64>,
}

/// Represents a stored article
#[derive(Debug, Clone)]
pub struct ArticleRecord {
    pub id: i64,
    pub source_id: i64,
    pub external_id: String,
    pub url: String,
    pub title: String,
    pub raw_summary: Option<String>,
    pub raw_content: String,
    pub published_at: Option<String>,
    pub author: Option<String>,
    pub confidence: f64,
    pub status: String,
    pub crawl_queue_entry_id: Option<i64>,
    pub created_at: String,
}

/// Represents a stored activity log row
#[derive(Debug, Clone)]
pub struct ActivityRecord {
    pub id: i64,
    pub event_type: String,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub metadata: Option<String>,
    pub created_at: String,
}
