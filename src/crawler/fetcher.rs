//! HTTP transport for the crawler
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeout
//! - GET requests for pages and resources
//! - HEAD requests for freshness probes
//! - Error classification for the retry policy

use crate::config::CrawlerConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{redirect::Policy, Client};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Maximum number of redirects followed for one request
pub const MAX_REDIRECTS: usize = 10;

/// Extra headers sent with page requests
pub const PAGE_HEADERS: &[(&str, &str)] =
    &[("accept", "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")];

/// Extra headers sent with static resource requests
pub const RESOURCE_HEADERS: &[(&str, &str)] = &[("accept", "*/*")];

/// A complete HTTP response with its body buffered
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// Final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: u16,
    /// Response headers, names lowercased
    pub headers: HashMap<String, String>,
    /// Response body
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Returns true if the body should be parsed as an HTML page
    ///
    /// A response without a Content-Type is sniffed from its first bytes.
    pub fn is_html(&self) -> bool {
        match self.content_type() {
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml+xml")
            }
            None => looks_like_html(&self.body),
        }
    }

    /// Parsed `Last-Modified` header
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.header("last-modified").and_then(parse_http_date)
    }

    /// Body decoded as UTF-8, invalid sequences replaced
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Converts a non-2xx response into a [`FetchError::Status`]
    pub fn error_for_status(self) -> Result<Self, FetchError> {
        if (200..300).contains(&self.status) {
            return Ok(self);
        }
        let retry_after = if self.status == 429 || self.status == 503 {
            parse_retry_after(self.header("retry-after"), Utc::now())
        } else {
            None
        };
        Err(FetchError::Status {
            status: self.status,
            retry_after,
        })
    }
}

/// Sniffs the first bytes of a document for an HTML prologue
pub fn looks_like_html(body: &[u8]) -> bool {
    let head = String::from_utf8_lossy(&body[..body.len().min(256)])
        .trim_start()
        .to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// Errors produced by a [`Transport`]
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}")]
    Status {
        status: u16,
        retry_after: Option<Duration>,
    },
}

impl FetchError {
    /// Returns true if another attempt may succeed
    ///
    /// | Condition | Retryable |
    /// |-----------|-----------|
    /// | Timeout, connection or other network failure | yes |
    /// | HTTP 5xx | yes |
    /// | HTTP 429 | yes |
    /// | Any other HTTP status | no |
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Connect(_) | Self::Network(_) => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
        }
    }

    /// Wait requested by the server, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Status { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// Network capability used by the crawl and resource workers
///
/// Implementations return every response that arrives, whatever its status;
/// callers decide what a status means with [`HttpResponse::error_for_status`].
/// The user agent is fixed per transport; `headers` are added per request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a GET request with `headers` and buffers the body
    async fn fetch(&self, url: &Url, headers: &[(&str, &str)]) -> Result<HttpResponse, FetchError>;

    /// Sends a HEAD request
    async fn head(&self, url: &Url) -> Result<HttpResponse, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The crawler configuration (user agent and timeout)
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use sumi_mirror::config::CrawlerConfig;
/// use sumi_mirror::crawler::build_http_client;
///
/// let client = build_http_client(&CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.request_timeout())
        .connect_timeout(config.request_timeout())
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// [`Transport`] backed by a shared `reqwest` client
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<HttpResponse, FetchError> {
        let response = request.send().await?;

        let final_url = response.url().clone();
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            final_url,
            status,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(&self, url: &Url, headers: &[(&str, &str)]) -> Result<HttpResponse, FetchError> {
        let request = headers
            .iter()
            .fold(self.client.get(url.as_str()), |request, (name, value)| {
                request.header(*name, *value)
            });
        self.send(request).await
    }

    async fn head(&self, url: &Url) -> Result<HttpResponse, FetchError> {
        self.send(self.client.head(url.as_str())).await
    }
}

/// Parses an HTTP date (RFC 2822 / IMF-fixdate)
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses a `Retry-After` header value
///
/// Accepts delta-seconds or an HTTP date; a date in the past yields zero.
pub fn parse_retry_after(header_value: Option<&str>, now: DateTime<Utc>) -> Option<Duration> {
    let value = header_value?.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let at = parse_http_date(value)?;
    Some((at - now).to_std().unwrap_or(Duration::ZERO))
}
