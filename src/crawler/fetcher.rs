//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the identifying user agent
//! - HEAD requests used by discovery probes
//! - GET requests for pages, robots.txt and sitemaps
//! - Error classification

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::{QuillError, Result};
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client, Response};

/// Result of a page fetch
#[derive(Debug)]
pub enum FetchResult {
    /// Successfully fetched an HTML page
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value
        content_type: String,
        /// Page body content
        body: String,
    },

    /// Page is not HTML; the body was not read
    ContentMismatch {
        /// The actual Content-Type received
        content_type: String,
    },

    /// Server answered with a status of 400 or above
    HttpError {
        /// The HTTP status code
        status_code: u16,
    },

    /// Network error (connection refused, timeout, too many redirects, etc.)
    NetworkError {
        /// Error description
        error: String,
    },
}

/// Status and content type returned by a HEAD request
#[derive(Debug, Clone, PartialEq)]
pub struct HeadResponse {
    /// HTTP status code
    pub status_code: u16,
    /// Content-Type header value, empty if absent
    pub content_type: String,
}

impl HeadResponse {
    /// Returns true if the status is 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Returns true if the content type names an XML document
    pub fn is_xml(&self) -> bool {
        self.content_type.to_lowercase().contains("xml")
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - The user agent configuration
/// * `crawler` - Supplies the request timeout and redirect limit
///
/// # Example
///
/// ```no_run
/// use quill_crawl::config::{CrawlerConfig, UserAgentConfig};
/// use quill_crawl::crawler::build_http_client;
///
/// let user_agent = UserAgentConfig {
///     crawler_name: "QuillBot".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/bot".to_string(),
/// };
///
/// let client = build_http_client(&user_agent, &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(crawler.timeout())
        .connect_timeout(crawler.timeout())
        .redirect(Policy::limited(crawler.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Thin wrapper around a configured HTTP client
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    /// Creates a fetcher from configuration
    pub fn new(user_agent: &UserAgentConfig, crawler: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(user_agent, crawler)?,
        })
    }

    /// Wraps an existing client
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetches a page that is expected to be HTML
    ///
    /// | Condition | Result |
    /// |-----------|--------|
    /// | status < 400, HTML | `Success` |
    /// | status < 400, other type | `ContentMismatch` |
    /// | status >= 400 | `HttpError` |
    /// | timeout, connect, redirect limit | `NetworkError` |
    pub async fn fetch_page(&self, url: &str) -> FetchResult {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return FetchResult::NetworkError {
                error: classify_error(&e),
            },
        };

        let status = response.status();
        if status.as_u16() >= 400 {
            return FetchResult::HttpError {
                status_code: status.as_u16(),
            };
        }

        let final_url = response.url().to_string();
        let content_type = content_type_of(&response);

        if !is_html_content_type(&content_type) {
            return FetchResult::ContentMismatch { content_type };
        }

        match response.text().await {
            Ok(body) => FetchResult::Success {
                final_url,
                status_code: status.as_u16(),
                content_type,
                body,
            },
            Err(e) => FetchResult::NetworkError {
                error: classify_error(&e),
            },
        }
    }

    /// Fetches a text resource of any type, failing on non-2xx statuses
    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                QuillError::Timeout {
                    url: url.to_string(),
                }
            } else {
                QuillError::Http {
                    url: url.to_string(),
                    source: e,
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(QuillError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| QuillError::Http {
            url: url.to_string(),
            source: e,
        })
    }

    /// Sends a HEAD request
    pub async fn head(&self, url: &str) -> Result<HeadResponse> {
        let response = self
            .client
            .head(url)
            .send()
            .await
            .map_err(|e| QuillError::Http {
                url: url.to_string(),
                source: e,
            })?;

        Ok(HeadResponse {
            status_code: response.status().as_u16(),
            content_type: content_type_of(&response),
        })
    }
}

/// Returns true if a Content-Type names an HTML document
///
/// A missing Content-Type is treated as HTML.
pub fn is_html_content_type(content_type: &str) -> bool {
    let content_type = content_type.trim().to_lowercase();
    content_type.is_empty()
        || content_type.contains("text/html")
        || content_type.contains("application/xhtml")
}

fn content_type_of(response: &Response) -> String {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

fn classify_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "Request timeout".to_string()
    } else if e.is_connect() {
        "Connection refused".to_string()
    } else if e.is_redirect() {
        "Too many redirects".to_string()
    } else {
        e.to_string()
    }
}
