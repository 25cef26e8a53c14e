//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::activity::ActivityEvent;
use crate::robots::RobotsRules;
use crate::state::{EntryStatus, SitemapType, SourceType};
use crate::storage::{
    ActivityRecord, ArticleRecord, NewArticle, QueueEntry, SitemapRecord, SourceRecord,
};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Source not found: {0}")]
    SourceNotFound(i64),

    #[error("Queue entry not found: {0}")]
    EntryNotFound(i64),

    #[error("Invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition { from: EntryStatus, to: EntryStatus },

    #[error("Queue entry {id} is no longer {expected}")]
    StaleStatus { id: i64, expected: EntryStatus },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by the engine.
/// Mutations are keyed upserts or conditional updates so that a repeated
/// call never duplicates rows or overwrites a newer status.
pub trait Storage {
    // ===== Sources =====

    /// Registers a source or returns the existing ID for its home URL
    fn create_source(&mut self, home_url: &str, source_type: SourceType) -> StorageResult<i64>;

    /// Gets a source by ID
    fn get_source(&self, source_id: i64) -> StorageResult<SourceRecord>;

    /// Lists all sources ordered by ID
    fn list_sources(&self) -> StorageResult<Vec<SourceRecord>>;

    /// Lists active sources ordered by ID
    fn list_active_sources(&self) -> StorageResult<Vec<SourceRecord>>;

    /// Toggles whether a source takes part in crawl cycles
    fn set_source_active(&mut self, source_id: i64, active: bool) -> StorageResult<()>;

    /// Deletes a source with its queue, sitemaps and articles
    fn delete_source(&mut self, source_id: i64) -> StorageResult<()>;

    /// Stores the outcome of discovery and stamps `last_checked_at`
    ///
    /// # Arguments
    ///
    /// * `source_id` - The source ID
    /// * `rules` - The new robots.txt snapshot, replacing any previous one
    /// * `feed_url` - The first discovered feed, if any
    /// * `source_type` - The type to record
    fn record_discovery(
        &mut self,
        source_id: i64,
        rules: &RobotsRules,
        feed_url: Option<&str>,
        source_type: SourceType,
    ) -> StorageResult<()>;

    /// Stamps `last_crawl_started_at`
    fn mark_crawl_started(&mut self, source_id: i64) -> StorageResult<()>;

    /// Stamps `last_crawl_completed_at`
    fn mark_crawl_completed(&mut self, source_id: i64) -> StorageResult<()>;

    // ===== Sitemaps =====

    /// Records a sitemap as PENDING unless it is already known
    fn upsert_sitemap(
        &mut self,
        source_id: i64,
        sitemap_url: &str,
        sitemap_type: SitemapType,
    ) -> StorageResult<()>;

    /// Gets all sitemaps of a source ordered by ID
    fn get_sitemaps(&self, source_id: i64) -> StorageResult<Vec<SitemapRecord>>;

    /// Gets the PENDING sitemaps of a source ordered by ID
    fn get_pending_sitemaps(&self, source_id: i64) -> StorageResult<Vec<SitemapRecord>>;

    /// Marks a sitemap FETCHED with the number of `<loc>` URLs it listed
    fn mark_sitemap_fetched(&mut self, sitemap_id: i64, url_count: u32) -> StorageResult<()>;

    /// Marks a sitemap FAILED with an error message
    fn mark_sitemap_failed(&mut self, sitemap_id: i64, message: &str) -> StorageResult<()>;

    /// Puts every sitemap of a source back to PENDING
    fn reset_sitemaps(&mut self, source_id: i64) -> StorageResult<u64>;

    /// Deletes every sitemap record of a source
    fn clear_sitemaps(&mut self, source_id: i64) -> StorageResult<u64>;

    // ===== Crawl Queue =====

    /// Inserts a PENDING entry unless `(source_id, url)` already exists
    ///
    /// Returns true if a new entry was created. An existing entry keeps its
    /// depth and status.
    fn enqueue_url(&mut self, source_id: i64, url: &str, depth: u32) -> StorageResult<bool>;

    /// Gets a queue entry by ID
    fn get_queue_entry(&self, entry_id: i64) -> StorageResult<QueueEntry>;

    /// Gets a queue entry by its URL within a source
    fn get_queue_entry_by_url(&self, source_id: i64, url: &str)
        -> StorageResult<Option<QueueEntry>>;

    /// Gets up to `limit` PENDING entries ordered by depth, discovery time and ID
    fn get_pending_entries(&self, source_id: i64, limit: u32) -> StorageResult<Vec<QueueEntry>>;

    /// Gets every entry of a source in frontier order
    fn list_queue_entries(&self, source_id: i64) -> StorageResult<Vec<QueueEntry>>;

    /// Counts all entries of a source, whatever their status
    fn count_queue_entries(&self, source_id: i64) -> StorageResult<u64>;

    /// Counts the entries of a source per status
    fn count_entries_by_status(&self, source_id: i64) -> StorageResult<HashMap<EntryStatus, u64>>;

    /// Claims a PENDING entry: FETCHING, `fetch_count + 1`, `last_tried_at = now`
    fn claim_entry(&mut self, entry_id: i64) -> StorageResult<()>;

    /// Moves an entry from `from` to `to` if it is still in `from`
    ///
    /// # Arguments
    ///
    /// * `entry_id` - The entry ID
    /// * `from` - The status the entry is expected to hold
    /// * `to` - The new status; must be allowed by [`EntryStatus::can_transition_to`]
    /// * `title` - Stored when present
    /// * `error_message` - Stored as given (None clears it)
    fn transition_entry(
        &mut self,
        entry_id: i64,
        from: EntryStatus,
        to: EntryStatus,
        title: Option<&str>,
        error_message: Option<&str>,
    ) -> StorageResult<()>;

    /// Deletes every queue entry of a source, returning how many were removed
    fn clear_queue(&mut self, source_id: i64) -> StorageResult<u64>;

    // ===== Articles =====

    /// Creates an article unless `(source_id, url)` already has one
    ///
    /// Returns the new ID, or None if the article already existed.
    fn insert_article(&mut self, article: &NewArticle) -> StorageResult<Option<i64>>;

    /// Gets the article for a URL within a source
    fn get_article_by_url(&self, source_id: i64, url: &str)
        -> StorageResult<Option<ArticleRecord>>;

    /// Lists the articles of a source ordered by ID
    fn list_articles(&self, source_id: i64) -> StorageResult<Vec<ArticleRecord>>;

    /// Counts the articles of a source
    fn count_articles(&self, source_id: i64) -> StorageResult<u64>;

    // ===== Activity Log =====

    /// Appends an activity event
    fn insert_activity(&mut self, event: &ActivityEvent) -> StorageResult<i64>;

    /// Gets the most recent activity events, newest first
    fn recent_activity(&self, limit: u32) -> StorageResult<Vec<ActivityRecord>>;
}
