//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Quill database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Registered content sources
CREATE TABLE IF NOT EXISTS sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    home_url TEXT NOT NULL UNIQUE,
    discovered_feed_url TEXT,
    source_type TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    robots_rules TEXT,
    last_checked_at TEXT,
    last_crawl_started_at TEXT,
    last_crawl_completed_at TEXT,
    created_at TEXT NOT NULL
);

-- Persistent crawl frontier, one row per (source, url)
CREATE TABLE IF NOT EXISTS crawl_queue (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL REFERENCES sources(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    depth INTEGER NOT NULL CHECK (depth >= 0),
    status TEXT NOT NULL,
    discovered_at TEXT NOT NULL,
    last_tried_at TEXT,
    fetch_count INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    title TEXT,
    UNIQUE(source_id, url)
);

CREATE INDEX IF NOT EXISTS idx_crawl_queue_frontier
    ON crawl_queue(source_id, status, depth, discovered_at, id);

-- Sitemaps found by discovery
CREATE TABLE IF NOT EXISTS discovered_sitemaps (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL REFERENCES sources(id) ON DELETE CASCADE,
    sitemap_url TEXT NOT NULL,
    sitemap_type TEXT NOT NULL,
    status TEXT NOT NULL,
    url_count INTEGER,
    error_message TEXT,
    discovered_at TEXT NOT NULL,
    last_fetched_at TEXT,
    UNIQUE(source_id, sitemap_url)
);

-- Pages classified as articles
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL REFERENCES sources(id) ON DELETE CASCADE,
    external_id TEXT NOT NULL,
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    raw_summary TEXT,
    raw_content TEXT NOT NULL,
    published_at TEXT,
    author TEXT,
    confidence REAL NOT NULL,
    status TEXT NOT NULL DEFAULT 'NEW',
    crawl_queue_entry_id INTEGER REFERENCES crawl_queue(id) ON DELETE SET NULL,
    created_at TEXT NOT NULL,
    UNIQUE(source_id, external_id)
);

CREATE INDEX IF NOT EXISTS idx_articles_source ON articles(source_id);

-- Operator-visible activity feed
CREATE TABLE IF NOT EXISTS activity_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    event_type TEXT NOT NULL,
    message TEXT NOT NULL,
    entity_type TEXT,
    entity_id INTEGER,
    metadata TEXT,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_activity_log_created ON activity_log(created_at);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
