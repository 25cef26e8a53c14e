//! Configuration module for Quill
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every crawler and detector option has a default, so a minimal file only needs
//! the `[user-agent]` and `[output]` tables.
//!
//! # Example
//!
//! ```no_run
//! use quill_crawl::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("quill.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, CrawlerConfig, DetectorConfig, OutputConfig, UserAgentConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
