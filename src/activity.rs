//! Activity log
//!
//! Fire-and-forget events surfaced to operators: discovery results, crawl
//! milestones, new articles and failures. Writing an event never fails the
//! caller; a failed write is traced as a warning and dropped.

use crate::storage::{SqliteStorage, Storage};
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// Kinds of activity events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Discovery finished for a source
    SourceDiscovered,
    /// A source crawl started
    CrawlStarted,
    /// A source crawl finished
    CrawlCompleted,
    /// A source crawl aborted with an error
    CrawlFailed,
    /// A page was stored as an article
    ArticleDiscovered,
    /// A sitemap could not be fetched or parsed
    SitemapFailed,
    /// An operator cleared a source's frontier
    QueueReset,
}

impl EventType {
    /// Converts to database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::SourceDiscovered => "source_discovered",
            Self::CrawlStarted => "crawl_started",
            Self::CrawlCompleted => "crawl_completed",
            Self::CrawlFailed => "crawl_failed",
            Self::ArticleDiscovered => "article_discovered",
            Self::SitemapFailed => "sitemap_failed",
            Self::QueueReset => "queue_reset",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// One activity event
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityEvent {
    pub event_type: EventType,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub metadata: Option<Value>,
}

impl ActivityEvent {
    pub fn new(event_type: EventType, message: impl Into<String>) -> Self {
        Self {
            event_type,
            message: message.into(),
            entity_type: None,
            entity_id: None,
            metadata: None,
        }
    }

    /// Attaches the entity the event is about
    pub fn for_entity(mut self, entity_type: &str, entity_id: i64) -> Self {
        self.entity_type = Some(entity_type.to_string());
        self.entity_id = Some(entity_id);
        self
    }

    /// Attaches structured metadata, stored as JSON
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Destination for activity events
pub trait ActivitySink {
    /// Records an event; never fails
    fn log_event(&mut self, event: ActivityEvent);
}

impl ActivitySink for SqliteStorage {
    fn log_event(&mut self, event: ActivityEvent) {
        if let Err(e) = self.insert_activity(&event) {
            warn!(
                "Failed to record activity event {}: {}",
                event.event_type, e
            );
        }
    }
}

/// In-memory sink that keeps every event
impl ActivitySink for Vec<ActivityEvent> {
    fn log_event(&mut self, event: ActivityEvent) {
        self.push(event);
    }
}
