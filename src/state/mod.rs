//! State module for tracking crawl progress
//!
//! This module provides the status and classification enums persisted by the
//! storage layer.
//!
//! # Components
//!
//! - `EntryStatus`: State machine of a crawl queue entry (pending, fetching, fetched, ...)
//! - `SitemapStatus` / `SitemapType`: Lifecycle and kind of a discovered sitemap
//! - `SourceType`: How a source's content is best reached

mod entry_status;
mod source_kind;

// Re-export main types
pub use entry_status::EntryStatus;
pub use source_kind::{SitemapStatus, SitemapType, SourceType};
