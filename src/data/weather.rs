//! Weather API fetch client
//!
//! The cache treats the upstream API as an opaque `fetch(url) -> JSON` call.
//! `Fetcher` is that seam; `WeatherClient` is the reqwest-backed implementation.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use thiserror::Error;

/// Default request timeout for upstream calls
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest response body excerpt kept in a status error
const ERROR_BODY_LIMIT: usize = 512;

/// Errors that can occur when fetching weather data
#[derive(Debug, Error)]
pub enum FetchError {
    /// HTTP request failed; the URL is stripped since it carries the API key
    #[error("HTTP request failed: {0}")]
    RequestFailed(reqwest::Error),

    /// Upstream answered with a non-success status
    #[error("upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),
}

/// The external fetch capability the cache reads through
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url` and returns the parsed JSON body
    async fn fetch(&self, url: &Url) -> Result<Value, FetchError>;
}

/// Client for fetching weather payloads over HTTP
#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Client,
}

impl Default for WeatherClient {
    fn default() -> Self {
        Self::new()
    }
}

impl WeatherClient {
    /// Create a new WeatherClient with default settings
    pub fn new() -> Self {
        Self::with_client(Client::new())
    }

    /// Create a new WeatherClient with a custom HTTP client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Create a new WeatherClient whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("weathercache/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(FetchError::RequestFailed)?;
        Ok(Self::with_client(client))
    }
}

#[async_trait]
impl Fetcher for WeatherClient {
    async fn fetch(&self, url: &Url) -> Result<Value, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| FetchError::RequestFailed(e.without_url()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| FetchError::RequestFailed(e.without_url()))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                body: truncate(&text, ERROR_BODY_LIMIT),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

/// Cuts `text` to at most `limit` bytes on a char boundary
fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
