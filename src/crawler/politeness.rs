//! Per-host request pacing
//!
//! This module handles:
//! - Remembering when each host was last requested
//! - Computing the effective gap from the configured delay and robots.txt
//! - Sleeping until a host may be requested again
//!
//! A tracker lives for one crawl cycle (or one forced crawl) and is passed
//! explicitly; nothing is shared between runs.

use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Request history for a single host
#[derive(Debug, Clone, Copy)]
struct HostState {
    /// When the last request to this host was released
    last_request_time: Instant,

    /// Requests released to this host by this tracker
    request_count: u32,
}

/// Tracks per-host timing for one crawl run
#[derive(Debug)]
pub struct PolitenessTracker {
    /// Configured minimum delay between requests to the same host
    default_delay: Duration,

    /// Per-host state keyed by lowercase host
    hosts: HashMap<String, HostState>,
}

impl PolitenessTracker {
    /// Creates a tracker with the configured default delay
    pub fn new(default_delay: Duration) -> Self {
        Self {
            default_delay,
            hosts: HashMap::new(),
        }
    }

    /// Returns the gap required between two requests to one host
    ///
    /// This is the maximum of the configured delay and the robots.txt
    /// crawl delay, if any.
    pub fn required_gap(&self, crawl_delay: Option<Duration>) -> Duration {
        effective_delay(self.default_delay, crawl_delay)
    }

    /// Returns how long to wait before `host` may be requested, if at all
    pub fn time_until_next_request(
        &self,
        host: &str,
        crawl_delay: Option<Duration>,
        now: Instant,
    ) -> Option<Duration> {
        let state = self.hosts.get(&host.to_lowercase())?;
        let elapsed = now.saturating_duration_since(state.last_request_time);
        self.required_gap(crawl_delay)
            .checked_sub(elapsed)
            .filter(|wait| !wait.is_zero())
    }

    /// Waits until `host` may be requested, then records the request
    pub async fn wait_for(&mut self, host: &str, crawl_delay: Option<Duration>) {
        if let Some(wait) = self.time_until_next_request(host, crawl_delay, Instant::now()) {
            tracing::debug!("Waiting {:?} before next request to {}", wait, host);
            tokio::time::sleep(wait).await;
        }
        self.record_request(host);
    }

    /// Records that a request to `host` is being made now
    pub fn record_request(&mut self, host: &str) {
        let now = Instant::now();
        self.hosts
            .entry(host.to_lowercase())
            .and_modify(|state| {
                state.last_request_time = now;
                state.request_count += 1;
            })
            .or_insert(HostState {
                last_request_time: now,
                request_count: 1,
            });
    }

    /// Returns the number of requests recorded for `host`
    pub fn request_count(&self, host: &str) -> u32 {
        self.hosts
            .get(&host.to_lowercase())
            .map(|state| state.request_count)
            .unwrap_or(0)
    }
}

/// Calculates the effective delay for a host
///
/// This takes the maximum of:
/// - The configured request delay
/// - The robots.txt crawl delay (if specified)
pub fn effective_delay(configured: Duration, crawl_delay: Option<Duration>) -> Duration {
    std::cmp::max(configured, crawl_delay.unwrap_or(Duration::ZERO))
}
