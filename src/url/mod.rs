//! URL handling module for Quill
//!
//! This module provides URL normalization, domain extraction and the link
//! eligibility rules shared by sitemap seeding and link extraction.

mod domain;
mod filter;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, is_same_site, site_key};
pub use filter::{has_static_extension, is_non_content, LinkFilter, STATIC_EXTENSIONS};
pub use normalize::{normalize_parsed, normalize_url};
