//! Configuration module for the crawler
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use publiccode_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("crawler.toml")).unwrap();
//! println!("Crawling {} domains", config.domains.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ClientApi, Config, CrawlerConfig, DomainConfig, MetricsConfig, ProgressConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
