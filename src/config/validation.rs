use crate::config::types::{Config, CrawlerConfig, DomainConfig, MetricsConfig, UserAgentConfig};
use crate::ConfigError;
use std::collections::HashSet;
use std::net::SocketAddr;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_progress_config(&config.progress.database_path)?;
    validate_metrics_config(&config.metrics)?;
    validate_domains(&config.domains)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_crawled_filename(&config.crawled_filename)?;

    if config.data_dir.is_empty() {
        return Err(ConfigError::Validation(
            "data_dir cannot be empty".to_string(),
        ));
    }

    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 1024 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_fetches must be between 1 and 1024, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.request_timeout == 0 {
        return Err(ConfigError::Validation(
            "request_timeout must be at least 1 second".to_string(),
        ));
    }

    if config.pagination_max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "pagination_max_attempts must be >= 1, got {}",
            config.pagination_max_attempts
        )));
    }

    if config.pagination_max_backoff < config.pagination_initial_backoff {
        return Err(ConfigError::Validation(format!(
            "pagination_max_backoff ({}ms) must be >= pagination_initial_backoff ({}ms)",
            config.pagination_max_backoff, config.pagination_initial_backoff
        )));
    }

    Ok(())
}

/// The manifest name becomes the last path segment of every saved file
fn validate_crawled_filename(name: &str) -> Result<(), ConfigError> {
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "crawled_filename cannot be empty".to_string(),
        ));
    }

    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(ConfigError::Validation(format!(
            "crawled_filename must be a plain file name, got '{}'",
            name
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    // Validate crawler name: non-empty, alphanumeric + hyphens only
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters and hyphens, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

fn validate_progress_config(database_path: &str) -> Result<(), ConfigError> {
    if database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_metrics_config(config: &MetricsConfig) -> Result<(), ConfigError> {
    if let Some(listen) = &config.listen {
        listen.parse::<SocketAddr>().map_err(|e| {
            ConfigError::Validation(format!("Invalid metrics listen address '{}': {}", listen, e))
        })?;
    }
    Ok(())
}

/// Validates domain entries
fn validate_domains(domains: &[DomainConfig]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for domain in domains {
        validate_domain_id(&domain.id)?;

        if !seen.insert(domain.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate domain id '{}'",
                domain.id
            )));
        }

        let url = Url::parse(&domain.url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid url for domain '{}': {}", domain.id, e))
        })?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::Validation(format!(
                "Domain '{}' url must use HTTP(S), got '{}'",
                domain.id,
                url.scheme()
            )));
        }
    }

    Ok(())
}

/// Domain ids are used as directory names under the data dir
fn validate_domain_id(id: &str) -> Result<(), ConfigError> {
    if id.is_empty() {
        return Err(ConfigError::Validation(
            "Domain id cannot be empty".to_string(),
        ));
    }

    if !id
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == '_')
        || id.starts_with('.')
    {
        return Err(ConfigError::Validation(format!(
            "Domain id '{}' may only contain alphanumerics, '.', '-' and '_' and cannot start with '.'",
            id
        )));
    }

    Ok(())
}
