//! publiccode-crawler: a resumable crawler for `publiccode.yml` manifests
//!
//! This crate walks the paginated repository listings of a configured set of
//! code-hosting domains, fetches the manifest file of every discovered
//! repository, stores it under `data/<domain>/<vendor>/<repo>/` and validates it.

pub mod config;
pub mod crawler;
pub mod listing;
pub mod metrics;
pub mod output;
pub mod publiccode;
pub mod storage;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Unexpected HTTP status {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Malformed listing at {url}: {message}")]
    Listing { url: String, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Persistence error: {0}")]
    Persist(#[from] crawler::PersistError),

    #[error("Validation error: {0}")]
    Validation(#[from] publiccode::ValidationError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Repository queue is closed")]
    QueueClosed,

    #[error("Metrics error: {0}")]
    Metrics(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for crawler operations
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, DomainConfig};
pub use crawler::{run_crawl, CrawlReport, Repository};
pub use storage::{ProgressStatus, ProgressStore};
