//! Output module for crawl reports
//!
//! This module handles:
//! - Loading per-source frontier and article counts
//! - Printing them for the operator

pub mod stats;

pub use stats::{load_statistics, print_statistics, CrawlStats};
