//! Statistics generation from the crawl database
//!
//! This module provides functionality for extracting and displaying
//! per-source crawl statistics from the storage layer.

use crate::state::{EntryStatus, SitemapStatus, SourceType};
use crate::storage::Storage;
use crate::Result;
use std::collections::HashMap;

/// Crawl statistics for one source
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStats {
    pub source_id: i64,
    pub home_url: String,
    pub source_type: SourceType,
    pub active: bool,

    /// Total number of frontier entries
    pub total_entries: u64,

    /// Count of entries by status (zero counts omitted)
    pub entries_by_status: HashMap<EntryStatus, u64>,

    /// Articles stored for this source
    pub articles: u64,

    /// Sitemaps known for this source
    pub sitemaps: u64,
    pub pending_sitemaps: u64,
    pub failed_sitemaps: u64,

    pub last_checked_at: Option<String>,
    pub last_crawl_started_at: Option<String>,
    pub last_crawl_completed_at: Option<String>,
}

impl CrawlStats {
    /// Count for a single status
    pub fn count(&self, status: EntryStatus) -> u64 {
        self.entries_by_status.get(&status).copied().unwrap_or(0)
    }

    /// Entries that reached a terminal status
    pub fn completed_entries(&self) -> u64 {
        EntryStatus::all_states()
            .iter()
            .filter(|status| status.is_terminal())
            .map(|status| self.count(*status))
            .sum()
    }
}

/// Loads statistics for a source from storage
pub fn load_statistics<S: Storage>(storage: &S, source_id: i64) -> Result<CrawlStats> {
    let source = storage.get_source(source_id)?;
    let total_entries = storage.count_queue_entries(source_id)?;
    let entries_by_status = storage.count_entries_by_status(source_id)?;
    let articles = storage.count_articles(source_id)?;

    let sitemaps = storage.get_sitemaps(source_id)?;
    let count_sitemaps =
        |status: SitemapStatus| sitemaps.iter().filter(|s| s.status == status).count() as u64;

    Ok(CrawlStats {
        source_id,
        home_url: source.home_url,
        source_type: source.source_type,
        active: source.active,
        total_entries,
        entries_by_status,
        articles,
        sitemaps: sitemaps.len() as u64,
        pending_sitemaps: count_sitemaps(SitemapStatus::Pending),
        failed_sitemaps: count_sitemaps(SitemapStatus::Failed),
        last_checked_at: source.last_checked_at,
        last_crawl_started_at: source.last_crawl_started_at,
        last_crawl_completed_at: source.last_crawl_completed_at,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStats) {
    println!("=== Crawl Statistics: source {} ===\n", stats.source_id);

    println!("Source:");
    println!("  Home URL: {}", stats.home_url);
    println!("  Type: {}", stats.source_type);
    println!("  Active: {}", if stats.active { "yes" } else { "no" });
    println!(
        "  Last checked: {}",
        stats.last_checked_at.as_deref().unwrap_or("never")
    );
    println!(
        "  Last crawl: {} -> {}",
        stats.last_crawl_started_at.as_deref().unwrap_or("never"),
        stats.last_crawl_completed_at.as_deref().unwrap_or("-")
    );
    println!();

    println!("Frontier ({} entries):", stats.total_entries);
    let mut status_counts: Vec<_> = stats.entries_by_status.iter().collect();
    status_counts.sort_by(|a, b| b.1.cmp(a.1));

    for (status, count) in status_counts {
        let percentage = if stats.total_entries > 0 {
            (*count as f64 / stats.total_entries as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    println!(
        "Sitemaps: {} ({} pending, {} failed)",
        stats.sitemaps, stats.pending_sitemaps, stats.failed_sitemaps
    );
    println!("Articles: {}", stats.articles);
    println!(
        "Progress: {} / {} entries done",
        stats.completed_entries(),
        stats.total_entries
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SitemapType;
    use crate::storage::{NewArticle, SqliteStorage};

    #[test]
    fn test_load_statistics_counts_everything() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage
            .create_source("https://blog.example.com", SourceType::Homepage)
            .unwrap();

        storage.enqueue_url(id, "https://blog.example.com", 0).unwrap();
        storage.enqueue_url(id, "https://blog.example.com/a", 1).unwrap();
        storage.enqueue_url(id, "https://blog.example.com/b", 1).unwrap();

        let entry = storage
            .get_queue_entry_by_url(id, "https://blog.example.com/a")
            .unwrap()
            .unwrap();
        storage
            .transition_entry(
                entry.id,
                EntryStatus::Pending,
                EntryStatus::Skipped,
                None,
                Some("Disallowed by robots.txt"),
            )
            .unwrap();

        storage
            .upsert_sitemap(id, "https://blog.example.com/sitemap.xml", SitemapType::Standard)
            .unwrap();
        storage
            .upsert_sitemap(id, "https://blog.example.com/news.xml", SitemapType::Standard)
            .unwrap();
        let failed = storage
            .get_sitemaps(id)
            .unwrap()
            .into_iter()
            .find(|s| s.sitemap_url.ends_with("news.xml"))
            .unwrap();
        storage.mark_sitemap_failed(failed.id, "HTTP 404").unwrap();

        storage
            .insert_article(&NewArticle {
                source_id: id,
                url: "https://blog.example.com/b".to_string(),
                title: "B".to_string(),
                raw_summary: None,
                raw_content: "Body".to_string(),
                published_at: None,
                author: None,
                confidence: 0.7,
                crawl_queue_entry_id: None,
            })
            .unwrap();

        let stats = load_statistics(&storage, id).unwrap();
        assert_eq!(stats.total_entries, 3);
        assert_eq!(stats.count(EntryStatus::Pending), 2);
        assert_eq!(stats.count(EntryStatus::Skipped), 1);
        assert_eq!(stats.count(EntryStatus::Failed), 0);
        assert_eq!(stats.completed_entries(), 1);
        assert_eq!(stats.articles, 1);
        assert_eq!(stats.sitemaps, 2);
        assert_eq!(stats.pending_sitemaps, 1);
        assert_eq!(stats.failed_sitemaps, 1);
        assert!(stats.last_crawl_started_at.is_none());
    }

    #[test]
    fn test_load_statistics_unknown_source() {
        let storage = SqliteStorage::new_in_memory().unwrap();
        assert!(load_statistics(&storage, 42).is_err());
    }
}
