//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests bounded by a hard timeout
//! - Redirect following (the queue key stays the requested URL)
//! - Error classification

use crate::config::{CrawlerConfig, UserAgentConfig};
use reqwest::{redirect::Policy, Client};
use std::fmt;
use std::time::Duration;

/// Classification of one fetch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// 2xx response with a readable body
    Success,

    /// Non-success HTTP status
    HttpError(u16),

    /// The request did not finish within the fetch timeout
    Timeout,

    /// Connection refused, DNS failure, TLS failure
    ConnectionError,

    /// Anything else (body decode, redirect loop, ...)
    OtherError(String),
}

impl FetchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success)
    }

    /// Human-readable failure description stored as `fail_reason`
    ///
    /// Returns `None` for `Success`.
    pub fn reason(&self) -> Option<String> {
        match self {
            FetchOutcome::Success => None,
            FetchOutcome::HttpError(status) => Some(format!("HTTP {}", status)),
            FetchOutcome::Timeout => Some("timeout".to_string()),
            FetchOutcome::ConnectionError => Some("connection error".to_string()),
            FetchOutcome::OtherError(message) => Some(message.clone()),
        }
    }
}

impl fmt::Display for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "{}", reason),
            None => write!(f, "success"),
        }
    }
}

/// Result of a fetch operation
///
/// `content` is empty unless the outcome is `Success`.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub content: String,
    pub outcome: FetchOutcome,
}

impl FetchResult {
    fn failed(outcome: FetchOutcome) -> Self {
        Self {
            content: String::new(),
            outcome,
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// The client timeout covers the whole request (connect, headers and body),
/// so a hung connection can never outlive `timeout`.
///
/// # Example
///
/// ```no_run
/// use frontier_crawler::config::UserAgentConfig;
/// use frontier_crawler::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(&UserAgentConfig::default(), Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .timeout(timeout)
        .connect_timeout(timeout)
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages with a shared client
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher from configuration
    pub fn from_config(
        crawler: &CrawlerConfig,
        user_agent: &UserAgentConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(user_agent, crawler.fetch_timeout())?))
    }

    /// Fetches a URL and classifies the outcome
    ///
    /// Never returns an error: every failure is folded into the outcome.
    ///
    /// | Condition | Outcome |
    /// |-----------|---------|
    /// | 2xx | Success |
    /// | 4xx / 5xx | HttpError(status) |
    /// | Timeout (any phase) | Timeout |
    /// | Connection refused, DNS, TLS | ConnectionError |
    /// | Anything else | OtherError |
    pub async fn fetch(&self, url: &str) -> FetchResult {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return FetchResult::failed(classify_error(&e)),
        };

        let status = response.status();
        if !status.is_success() {
            return FetchResult::failed(FetchOutcome::HttpError(status.as_u16()));
        }

        match response.text().await {
            Ok(content) => FetchResult {
                content,
                outcome: FetchOutcome::Success,
            },
            Err(e) => FetchResult::failed(classify_error(&e)),
        }
    }
}

fn classify_error(e: &reqwest::Error) -> FetchOutcome {
    if e.is_timeout() {
        FetchOutcome::Timeout
    } else if e.is_connect() {
        FetchOutcome::ConnectionError
    } else if e.is_redirect() {
        FetchOutcome::OtherError(format!("redirect error: {}", e))
    } else {
        FetchOutcome::OtherError(e.to_string())
    }
}
