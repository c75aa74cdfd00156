//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with per-domain headers
//! - Collecting status, headers and body into a transport-neutral response

use crate::config::UserAgentConfig;
use crate::CrawlerError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;

/// Response of a GET request
#[derive(Debug, Clone, Default)]
pub struct FetchResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers, names lower-cased
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Performs GET requests
///
/// A non-2xx status is not an error at this level; only transport failures are.
#[async_trait]
pub trait FetchClient: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<FetchResponse, CrawlerError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
/// * `timeout` - Total per-request timeout
///
/// # Example
///
/// ```no_run
/// use publiccode_crawler::config::UserAgentConfig;
/// use publiccode_crawler::crawler::build_http_client;
/// use std::time::Duration;
///
/// let config = UserAgentConfig {
///     crawler_name: "publiccode-crawler".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.com/about".to_string(),
/// };
///
/// let client = build_http_client(&config, Duration::from_secs(30)).unwrap();
/// ```
pub fn build_http_client(
    config: &UserAgentConfig,
    timeout: Duration,
) -> Result<Client, reqwest::Error> {
    // Format: CrawlerName/Version (+ContactURL)
    let user_agent = format!(
        "{}/{} (+{})",
        config.crawler_name, config.crawler_version, config.contact_url
    );

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed [`FetchClient`]
#[derive(Debug, Clone)]
pub struct HttpFetchClient {
    client: Client,
}

impl HttpFetchClient {
    pub fn new(config: &UserAgentConfig, timeout: Duration) -> Result<Self, CrawlerError> {
        Ok(Self {
            client: build_http_client(config, timeout)?,
        })
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

fn to_header_map(headers: &HashMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => tracing::warn!("Skipping invalid request header '{}'", name),
        }
    }
    map
}

#[async_trait]
impl FetchClient for HttpFetchClient {
    async fn get(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
    ) -> Result<FetchResponse, CrawlerError> {
        let response = self
            .client
            .get(url)
            .headers(to_header_map(headers))
            .send()
            .await
            .map_err(|source| CrawlerError::Http {
                url: url.to_string(),
                source,
            })?;

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

        let body = response
            .bytes()
            .await
            .map_err(|source| CrawlerError::Http {
                url: url.to_string(),
                source,
            })?
            .to_vec();

        Ok(FetchResponse {
            status,
            headers,
            body,
        })
    }
}
