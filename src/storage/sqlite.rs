//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::activity::ActivityEvent;
use crate::robots::RobotsRules;
use crate::state::{EntryStatus, SitemapStatus, SitemapType, SourceType};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    now_timestamp, ActivityRecord, ArticleRecord, NewArticle, QueueEntry, SitemapRecord,
    SourceRecord,
};
use crate::QuillError;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const SOURCE_COLUMNS: &str = "id, home_url, discovered_feed_url, source_type, active, robots_rules,
     last_checked_at, last_crawl_started_at, last_crawl_completed_at, created_at";

const QUEUE_COLUMNS: &str = "id, source_id, url, depth, status, discovered_at, last_tried_at,
     fetch_count, error_message, title";

const SITEMAP_COLUMNS: &str =
    "id, source_id, sitemap_url, sitemap_type, status, url_count, error_message";

const ARTICLE_COLUMNS: &str = "id, source_id, external_id, url, title, raw_summary, raw_content,
     published_at, author, confidence, status, crawl_queue_entry_id, created_at";

/// Frontier order shared by every queue listing
const FRONTIER_ORDER: &str = "ORDER BY depth ASC, discovered_at ASC, id ASC";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(QuillError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, QuillError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, QuillError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn query_entries(&self, sql: &str, source_id: i64, limit: i64) -> StorageResult<Vec<QueueEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let entries = stmt
            .query_map(params![source_id, limit], entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn query_sources(&self, sql: &str) -> StorageResult<Vec<SourceRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let sources = stmt
            .query_map([], source_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sources)
    }

    fn query_sitemaps(&self, sql: &str, source_id: i64) -> StorageResult<Vec<SitemapRecord>> {
        let mut stmt = self.conn.prepare(sql)?;
        let sitemaps = stmt
            .query_map(params![source_id], sitemap_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sitemaps)
    }

    fn require_source(&self, source_id: i64, changed: usize) -> StorageResult<()> {
        if changed == 0 {
            return Err(StorageError::SourceNotFound(source_id));
        }
        Ok(())
    }
}

fn source_from_row(row: &Row) -> rusqlite::Result<SourceRecord> {
    let robots_rules = match row.get::<_, Option<String>>(5)? {
        Some(json) => Some(
            serde_json::from_str::<RobotsRules>(&json)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(5, Type::Text, Box::new(e)))?,
        ),
        None => None,
    };

    Ok(SourceRecord {
        id: row.get(0)?,
        home_url: row.get(1)?,
        discovered_feed_url: row.get(2)?,
        source_type: SourceType::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(SourceType::Homepage),
        active: row.get(4)?,
        robots_rules,
        last_checked_at: row.get(6)?,
        last_crawl_started_at: row.get(7)?,
        last_crawl_completed_at: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn entry_from_row(row: &Row) -> rusqlite::Result<QueueEntry> {
    Ok(QueueEntry {
        id: row.get(0)?,
        source_id: row.get(1)?,
        url: row.get(2)?,
        depth: row.get(3)?,
        status: EntryStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(EntryStatus::Failed),
        discovered_at: row.get(5)?,
        last_tried_at: row.get(6)?,
        fetch_count: row.get(7)?,
        error_message: row.get(8)?,
        title: row.get(9)?,
    })
}

fn sitemap_from_row(row: &Row) -> rusqlite::Result<SitemapRecord> {
    Ok(SitemapRecord {
        id: row.get(0)?,
        source_id: row.get(1)?,
        sitemap_url: row.get(2)?,
        sitemap_type: SitemapType::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(SitemapType::Standard),
        status: SitemapStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(SitemapStatus::Failed),
        url_count: row.get(5)?,
        error_message: row.get(6)?,
    })
}

fn article_from_row(row: &Row) -> rusqlite::Result<ArticleRecord> {
    Ok(ArticleRecord {
        id: row.get(0)?,
        source_id: row.get(1)?,
        external_id: row.get(2)?,
        url: row.get(3)?,
        title: row.get(4)?,
        raw_summary: row.get(5)?,
        raw_content: row.get(6)?,
        published_at: row.get(7)?,
        author: row.get(8)?,
        confidence: row.get(9)?,
        status: row.get(10)?,
        crawl_queue_entry_id: row.get(11)?,
        created_at: row.get(12)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Sources =====

    fn create_source(&mut self, home_url: &str, source_type: SourceType) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT OR IGNORE INTO sources (home_url, source_type, active, created_at)
             VALUES (?1, ?2, 1, ?3)",
            params![home_url, source_type.to_db_string(), now_timestamp()],
        )?;

        let id = self.conn.query_row(
            "SELECT id FROM sources WHERE home_url = ?1",
            params![home_url],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn get_source(&self, source_id: i64) -> StorageResult<SourceRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM sources WHERE id = ?1", SOURCE_COLUMNS),
                params![source_id],
                source_from_row,
            )
            .optional()?
            .ok_or(StorageError::SourceNotFound(source_id))
    }

    fn list_sources(&self) -> StorageResult<Vec<SourceRecord>> {
        self.query_sources(&format!("SELECT {} FROM sources ORDER BY id", SOURCE_COLUMNS))
    }

    fn list_active_sources(&self) -> StorageResult<Vec<SourceRecord>> {
        self.query_sources(&format!(
            "SELECT {} FROM sources WHERE active = 1 ORDER BY id",
            SOURCE_COLUMNS
        ))
    }

    fn set_source_active(&mut self, source_id: i64, active: bool) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE sources SET active = ?1 WHERE id = ?2",
            params![active, source_id],
        )?;
        self.require_source(source_id, changed)
    }

    fn delete_source(&mut self, source_id: i64) -> StorageResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM sources WHERE id = ?1", params![source_id])?;
        self.require_source(source_id, changed)
    }

    fn record_discovery(
        &mut self,
        source_id: i64,
        rules: &RobotsRules,
        feed_url: Option<&str>,
        source_type: SourceType,
    ) -> StorageResult<()> {
        let rules_json = serde_json::to_string(rules)?;
        let changed = self.conn.execute(
            "UPDATE sources SET robots_rules = ?1, discovered_feed_url = ?2, source_type = ?3,
             last_checked_at = ?4 WHERE id = ?5",
            params![
                rules_json,
                feed_url,
                source_type.to_db_string(),
                now_timestamp(),
                source_id
            ],
        )?;
        self.require_source(source_id, changed)
    }

    fn mark_crawl_started(&mut self, source_id: i64) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE sources SET last_crawl_started_at = ?1 WHERE id = ?2",
            params![now_timestamp(), source_id],
        )?;
        self.require_source(source_id, changed)
    }

    fn mark_crawl_completed(&mut self, source_id: i64) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE sources SET last_crawl_completed_at = ?1 WHERE id = ?2",
            params![now_timestamp(), source_id],
        )?;
        self.require_source(source_id, changed)
    }

    // ===== Sitemaps =====

    fn upsert_sitemap(
        &mut self,
        source_id: i64,
        sitemap_url: &str,
        sitemap_type: SitemapType,
    ) -> StorageResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO discovered_sitemaps
             (source_id, sitemap_url, sitemap_type, status, discovered_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                source_id,
                sitemap_url,
                sitemap_type.to_db_string(),
                SitemapStatus::Pending.to_db_string(),
                now_timestamp()
            ],
        )?;
        Ok(())
    }

    fn get_sitemaps(&self, source_id: i64) -> StorageResult<Vec<SitemapRecord>> {
        self.query_sitemaps(
            &format!(
                "SELECT {} FROM discovered_sitemaps WHERE source_id = ?1 ORDER BY id",
                SITEMAP_COLUMNS
            ),
            source_id,
        )
    }

    fn get_pending_sitemaps(&self, source_id: i64) -> StorageResult<Vec<SitemapRecord>> {
        self.query_sitemaps(
            &format!(
                "SELECT {} FROM discovered_sitemaps WHERE source_id = ?1 AND status = '{}' ORDER BY id",
                SITEMAP_COLUMNS,
                SitemapStatus::Pending.to_db_string()
            ),
            source_id,
        )
    }

    fn mark_sitemap_fetched(&mut self, sitemap_id: i64, url_count: u32) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE discovered_sitemaps SET status = ?1, url_count = ?2, error_message = NULL,
             last_fetched_at = ?3 WHERE id = ?4",
            params![
                SitemapStatus::Fetched.to_db_string(),
                url_count,
                now_timestamp(),
                sitemap_id
            ],
        )?;
        Ok(())
    }

    fn mark_sitemap_failed(&mut self, sitemap_id: i64, message: &str) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE discovered_sitemaps SET status = ?1, error_message = ?2, last_fetched_at = ?3
             WHERE id = ?4",
            params![
                SitemapStatus::Failed.to_db_string(),
                message,
                now_timestamp(),
                sitemap_id
            ],
        )?;
        Ok(())
    }

    fn reset_sitemaps(&mut self, source_id: i64) -> StorageResult<u64> {
        let changed = self.conn.execute(
            "UPDATE discovered_sitemaps SET status = ?1, url_count = NULL, error_message = NULL
             WHERE source_id = ?2",
            params![SitemapStatus::Pending.to_db_string(), source_id],
        )?;
        Ok(changed as u64)
    }

    fn clear_sitemaps(&mut self, source_id: i64) -> StorageResult<u64> {
        let removed = self.conn.execute(
            "DELETE FROM discovered_sitemaps WHERE source_id = ?1",
            params![source_id],
        )?;
        Ok(removed as u64)
    }

    // ===== Crawl Queue =====

    fn enqueue_url(&mut self, source_id: i64, url: &str, depth: u32) -> StorageResult<bool> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO crawl_queue (source_id, url, depth, status, discovered_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                source_id,
                url,
                depth,
                EntryStatus::Pending.to_db_string(),
                now_timestamp()
            ],
        )?;
        Ok(inserted > 0)
    }

    fn get_queue_entry(&self, entry_id: i64) -> StorageResult<QueueEntry> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM crawl_queue WHERE id = ?1", QUEUE_COLUMNS),
                params![entry_id],
                entry_from_row,
            )
            .optional()?
            .ok_or(StorageError::EntryNotFound(entry_id))
    }

    fn get_queue_entry_by_url(
        &self,
        source_id: i64,
        url: &str,
    ) -> StorageResult<Option<QueueEntry>> {
        let entry = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM crawl_queue WHERE source_id = ?1 AND url = ?2",
                    QUEUE_COLUMNS
                ),
                params![source_id, url],
                entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    fn get_pending_entries(&self, source_id: i64, limit: u32) -> StorageResult<Vec<QueueEntry>> {
        self.query_entries(
            &format!(
                "SELECT {} FROM crawl_queue WHERE source_id = ?1 AND status = '{}' {} LIMIT ?2",
                QUEUE_COLUMNS,
                EntryStatus::Pending.to_db_string(),
                FRONTIER_ORDER
            ),
            source_id,
            i64::from(limit),
        )
    }

    fn list_queue_entries(&self, source_id: i64) -> StorageResult<Vec<QueueEntry>> {
        self.query_entries(
            &format!(
                "SELECT {} FROM crawl_queue WHERE source_id = ?1 {} LIMIT ?2",
                QUEUE_COLUMNS, FRONTIER_ORDER
            ),
            source_id,
            -1,
        )
    }

    fn count_queue_entries(&self, source_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM crawl_queue WHERE source_id = ?1",
            params![source_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_entries_by_status(&self, source_id: i64) -> StorageResult<HashMap<EntryStatus, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT status, COUNT(*) FROM crawl_queue WHERE source_id = ?1 GROUP BY status",
        )?;

        let mut counts = HashMap::new();
        let rows = stmt.query_map(params![source_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        for row in rows {
            let (status, count) = row?;
            if let Some(status) = EntryStatus::from_db_string(&status) {
                counts.insert(status, count as u64);
            }
        }

        Ok(counts)
    }

    fn claim_entry(&mut self, entry_id: i64) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE crawl_queue SET status = ?1, fetch_count = fetch_count + 1, last_tried_at = ?2
             WHERE id = ?3 AND status = ?4",
            params![
                EntryStatus::Fetching.to_db_string(),
                now_timestamp(),
                entry_id,
                EntryStatus::Pending.to_db_string()
            ],
        )?;

        if changed == 0 {
            // Distinguish a missing row from one that moved on
            self.get_queue_entry(entry_id)?;
            return Err(StorageError::StaleStatus {
                id: entry_id,
                expected: EntryStatus::Pending,
            });
        }
        Ok(())
    }

    fn transition_entry(
        &mut self,
        entry_id: i64,
        from: EntryStatus,
        to: EntryStatus,
        title: Option<&str>,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        if !from.can_transition_to(to) {
            return Err(StorageError::InvalidTransition { from, to });
        }

        let changed = self.conn.execute(
            "UPDATE crawl_queue SET status = ?1, title = COALESCE(?2, title), error_message = ?3
             WHERE id = ?4 AND status = ?5",
            params![
                to.to_db_string(),
                title,
                error_message,
                entry_id,
                from.to_db_string()
            ],
        )?;

        if changed == 0 {
            self.get_queue_entry(entry_id)?;
            return Err(StorageError::StaleStatus {
                id: entry_id,
                expected: from,
            });
        }
        Ok(())
    }

    fn clear_queue(&mut self, source_id: i64) -> StorageResult<u64> {
        let removed = self
            .conn
            .execute("DELETE FROM crawl_queue WHERE source_id = ?1", params![source_id])?;
        Ok(removed as u64)
    }

    // ===== Articles =====

    fn insert_article(&mut self, article: &NewArticle) -> StorageResult<Option<i64>> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO articles
             (source_id, external_id, url, title, raw_summary, raw_content, published_at,
              author, confidence, status, crawl_queue_entry_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'NEW', ?10, ?11)",
            params![
                article.source_id,
                article.url,
                article.url,
                article.title,
                article.raw_summary,
                article.raw_content,
                article.published_at,
                article.author,
                article.confidence,
                article.crawl_queue_entry_id,
                now_timestamp()
            ],
        )?;

        if inserted == 0 {
            return Ok(None);
        }
        Ok(Some(self.conn.last_insert_rowid()))
    }

    fn get_article_by_url(
        &self,
        source_id: i64,
        url: &str,
    ) -> StorageResult<Option<ArticleRecord>> {
        let article = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM articles WHERE source_id = ?1 AND external_id = ?2",
                    ARTICLE_COLUMNS
                ),
                params![source_id, url],
                article_from_row,
            )
            .optional()?;
        Ok(article)
    }

    fn list_articles(&self, source_id: i64) -> StorageResult<Vec<ArticleRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM articles WHERE source_id = ?1 ORDER BY id",
            ARTICLE_COLUMNS
        ))?;
        let articles = stmt
            .query_map(params![source_id], article_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(articles)
    }

    fn count_articles(&self, source_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM articles WHERE source_id = ?1",
            params![source_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Activity Log =====

    fn insert_activity(&mut self, event: &ActivityEvent) -> StorageResult<i64> {
        let metadata = event
            .metadata
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        self.conn.execute(
            "INSERT INTO activity_log (event_type, message, entity_type, entity_id, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                event.event_type.to_db_string(),
                event.message,
                event.entity_type,
                event.entity_id,
                metadata,
                now_timestamp()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn recent_activity(&self, limit: u32) -> StorageResult<Vec<ActivityRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_type, message, entity_type, entity_id, metadata, created_at
             FROM activity_log ORDER BY id DESC LIMIT ?1",
        )?;
        let records = stmt
            .query_map(params![limit], |row| {
                Ok(ActivityRecord {
                    id: row.get(0)?,
                    event_type: row.get(1)?,
                    message: row.get(2)?,
                    entity_type: row.get(3)?,
                    entity_id: row.get(4)?,
                    metadata: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}
