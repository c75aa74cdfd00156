use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub progress: ProgressConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default, rename = "domain")]
    pub domains: Vec<DomainConfig>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Name of the manifest file fetched from every repository
    #[serde(rename = "crawled-filename", default = "default_crawled_filename")]
    pub crawled_filename: String,

    /// Root directory for saved manifests
    #[serde(rename = "data-dir", default = "default_data_dir")]
    pub data_dir: String,

    /// Maximum number of repository fetches in flight at once
    #[serde(rename = "max-concurrent-fetches", default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: u32,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout", default = "default_request_timeout")]
    pub request_timeout: u64,

    /// Consecutive failures tolerated on a single listing page
    #[serde(rename = "pagination-max-attempts", default = "default_max_attempts")]
    pub pagination_max_attempts: u32,

    /// First retry delay after a listing failure (milliseconds)
    #[serde(rename = "pagination-initial-backoff", default = "default_initial_backoff")]
    pub pagination_initial_backoff: u64,

    /// Upper bound for the retry delay (milliseconds)
    #[serde(rename = "pagination-max-backoff", default = "default_max_backoff")]
    pub pagination_max_backoff: u64,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

/// Durable progress store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProgressConfig {
    /// Path to the SQLite database holding pagination checkpoints
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Metrics exporter configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
    /// Address for the Prometheus scrape endpoint; no exporter when unset
    pub listen: Option<String>,
}

/// Listing protocol spoken by a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientApi {
    Github,
    Gitlab,
    Bitbucket,
}

/// A code-hosting domain to crawl
#[derive(Debug, Clone, Deserialize)]
pub struct DomainConfig {
    /// Identifier, used as checkpoint key and data directory name
    pub id: String,

    #[serde(default)]
    pub description: String,

    #[serde(rename = "client-api")]
    pub client_api: ClientApi,

    /// First page of the repository listing
    pub url: String,

    /// Headers sent with every request for this domain (e.g. `Authorization`)
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_crawled_filename() -> String {
    "publiccode.yml".to_string()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_max_concurrent_fetches() -> u32 {
    32
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff() -> u64 {
    500
}

fn default_max_backoff() -> u64 {
    30_000
}
