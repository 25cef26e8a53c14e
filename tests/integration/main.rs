//! Integration tests against mock HTTP servers

mod common;
mod crawl_tests;
mod discovery_tests;
