//! Named counters for crawl observability
//!
//! Counters live in a local registry so a run can report them at the end, and every
//! increment is mirrored into the `metrics` facade so a Prometheus exporter can
//! scrape them while the crawl is running.

use crate::CrawlerError;
use dashmap::DashMap;
use metrics::{counter, describe_counter};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Repositories handed to a fetch task
pub const REPOSITORY_PROCESSED: &str = "repository_processed";
/// Manifests written to disk
pub const REPOSITORY_FILE_SAVED: &str = "repository_file_saved";
/// Manifests that passed validation
pub const REPOSITORY_FILE_SAVED_VALID: &str = "repository_file_saved_valid";
/// Domains whose listing was given up after exhausting retries
pub const PAGINATION_ABANDONED: &str = "pagination_abandoned";

#[derive(Debug)]
struct Counter {
    description: String,
    value: AtomicU64,
}

/// Registry of named monotonically increasing counters
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: DashMap<String, Arc<Counter>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the crawl counters already described
    pub fn with_crawl_counters() -> Self {
        let registry = Self::new();
        registry.register_counter(REPOSITORY_PROCESSED, "Number of repository processed.");
        registry.register_counter(REPOSITORY_FILE_SAVED, "Number of file saved.");
        registry.register_counter(REPOSITORY_FILE_SAVED_VALID, "Number of valid file saved.");
        registry.register_counter(
            PAGINATION_ABANDONED,
            "Number of domains whose listing was abandoned.",
        );
        registry
    }

    /// Registers a counter; registering an existing name keeps its value
    pub fn register_counter(&self, name: &str, description: &str) {
        self.counters.entry(name.to_string()).or_insert_with(|| {
            describe_counter!(name.to_string(), description.to_string());
            Arc::new(Counter {
                description: description.to_string(),
                value: AtomicU64::new(0),
            })
        });
    }

    /// Increments a counter by one, registering it on first use
    pub fn increment(&self, name: &str) {
        let entry = match self.counters.get(name) {
            Some(entry) => Arc::clone(entry.value()),
            None => {
                self.register_counter(name, "");
                match self.counters.get(name) {
                    Some(entry) => Arc::clone(entry.value()),
                    None => return,
                }
            }
        };

        entry.value.fetch_add(1, Ordering::Relaxed);
        counter!(name.to_string()).increment(1);
    }

    /// Current value of a counter (zero when unknown)
    pub fn get(&self, name: &str) -> u64 {
        self.counters
            .get(name)
            .map(|c| c.value().value.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Description a counter was registered with
    pub fn description(&self, name: &str) -> Option<String> {
        self.counters.get(name).map(|c| c.value().description.clone())
    }

    /// All counters, sorted by name
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        let mut values: Vec<_> = self
            .counters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().value.load(Ordering::Relaxed)))
            .collect();
        values.sort();
        values
    }
}

/// Installs the Prometheus exporter with an HTTP scrape endpoint
pub fn install_prometheus_exporter(listen: &str) -> Result<(), CrawlerError> {
    let addr: SocketAddr = listen
        .parse()
        .map_err(|e| CrawlerError::Metrics(format!("invalid listen address {}: {}", listen, e)))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| CrawlerError::Metrics(e.to_string()))?;

    tracing::info!("Metrics exporter listening on {}", addr);
    Ok(())
}
