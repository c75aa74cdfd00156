//! Crawler module for repository discovery and manifest processing
//!
//! This module contains the core crawling logic, including:
//! - One pagination loop per configured domain
//! - The shared repository queue and its completion tracking
//! - Bounded fan-out of fetch/save/validate tasks

mod coordinator;
mod dispatcher;
mod domain_crawler;
mod fetcher;
mod persistence;
mod queue;
mod task;
mod validation;

pub use coordinator::{CompletionCoordinator, WorkUnit};
pub use dispatcher::Dispatcher;
pub use domain_crawler::{CrawlOutcome, DomainCrawler, RetryPolicy};
pub use fetcher::{build_http_client, FetchClient, FetchResponse, HttpFetchClient};
pub use persistence::{split_full_name, FileStore, PersistError};
pub use queue::{repository_queue, QueuedRepository, RepositoryReceiver, RepositorySender};
pub use task::{process, TaskContext};
pub use validation::{base_dir, ValidationPipeline};

use crate::config::Config;
use crate::listing::processor_for;
use crate::metrics::{
    install_prometheus_exporter, MetricsRegistry, REPOSITORY_FILE_SAVED,
    REPOSITORY_FILE_SAVED_VALID, REPOSITORY_PROCESSED,
};
use crate::publiccode::PubliccodeValidator;
use crate::storage::{open_progress_store, ProgressStore};
use crate::CrawlerError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A repository discovered on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    /// `<vendor>/<repo>` full name as reported by the hosting API
    pub name: String,
    /// Where the manifest would be served from
    pub file_raw_url: String,
    /// Id of the domain the repository was listed on
    pub domain: String,
    /// Headers to send when fetching the manifest
    pub headers: HashMap<String, String>,
}

/// Summary of a finished crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub processed: u64,
    pub saved: u64,
    pub valid: u64,
    /// Domains whose pagination was given up, with the checkpointed URL
    pub abandoned_domains: Vec<(String, String)>,
    /// Every counter of the run, sorted by name
    pub counters: Vec<(String, u64)>,
    pub elapsed: Duration,
}

impl CrawlReport {
    fn from_run(
        metrics: &MetricsRegistry,
        outcomes: Vec<(String, CrawlOutcome)>,
        elapsed: Duration,
    ) -> Self {
        let abandoned_domains = outcomes
            .into_iter()
            .filter_map(|(domain, outcome)| match outcome {
                CrawlOutcome::Abandoned { url, .. } => Some((domain, url)),
                CrawlOutcome::Completed { .. } => None,
            })
            .collect();

        Self {
            processed: metrics.get(REPOSITORY_PROCESSED),
            saved: metrics.get(REPOSITORY_FILE_SAVED),
            valid: metrics.get(REPOSITORY_FILE_SAVED_VALID),
            abandoned_domains,
            counters: metrics.snapshot(),
            elapsed,
        }
    }
}

/// Runs the given crawlers against one shared queue until all work is done
///
/// Every crawler is registered before the launch unit is released, so the queue only
/// closes once all crawlers have finished and every queued repository was processed.
pub async fn execute(
    crawlers: Vec<DomainCrawler>,
    context: TaskContext,
    max_concurrent: usize,
) -> Vec<(String, CrawlOutcome)> {
    let (coordinator, receiver) = repository_queue();
    let mut handles = Vec::with_capacity(crawlers.len());

    for crawler in crawlers {
        let domain_id = crawler.domain_id().to_string();
        let sender = match coordinator.register_producer() {
            Ok(sender) => sender,
            Err(e) => {
                tracing::error!("Could not start crawler for {}: {}", domain_id, e);
                continue;
            }
        };
        handles.push((domain_id, tokio::spawn(crawler.run(sender))));
    }
    coordinator.launch_complete();

    let dispatched = Dispatcher::new(Arc::new(context), max_concurrent)
        .dispatch(receiver)
        .await;
    tracing::info!("{} repositories dispatched", dispatched);

    let mut outcomes = Vec::with_capacity(handles.len());
    for (domain_id, handle) in handles {
        match handle.await {
            Ok(outcome) => outcomes.push((domain_id, outcome)),
            Err(e) => tracing::error!("Crawler for {} panicked: {}", domain_id, e),
        }
    }
    outcomes
}

/// Runs a complete crawl over every configured domain
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the progress database (clearing checkpoints when `fresh`)
/// 2. Build the HTTP client, file store and validation pipeline
/// 3. Start one crawler per domain and process every discovered repository
/// 4. Return the run's counters
pub async fn run_crawl(config: Config, fresh: bool) -> Result<CrawlReport, CrawlerError> {
    let started = Instant::now();

    let store = Arc::new(open_progress_store(Path::new(&config.progress.database_path))?);
    if fresh {
        for domain in &config.domains {
            let cleared = store.clear_domain(&domain.id)?;
            if cleared > 0 {
                tracing::info!("Cleared {} checkpoints for {}", cleared, domain.id);
            }
        }
    }
    let progress: Arc<dyn ProgressStore> = store;

    let metrics = Arc::new(MetricsRegistry::with_crawl_counters());
    if let Some(listen) = &config.metrics.listen {
        install_prometheus_exporter(listen)?;
    }

    let client: Arc<dyn FetchClient> = Arc::new(HttpFetchClient::new(
        &config.user_agent,
        Duration::from_secs(config.crawler.request_timeout),
    )?);

    let file_name = config.crawler.crawled_filename.as_str();
    let context = TaskContext {
        client: Arc::clone(&client),
        files: FileStore::new(&config.crawler.data_dir, file_name, Arc::clone(&metrics)),
        validation: ValidationPipeline::new(
            Arc::new(PubliccodeValidator::new()),
            file_name,
            Arc::clone(&metrics),
        ),
        metrics: Arc::clone(&metrics),
    };

    let retry = RetryPolicy::from_config(&config.crawler);
    let crawlers = config
        .domains
        .iter()
        .map(|domain| {
            DomainCrawler::new(
                domain.clone(),
                processor_for(domain, Arc::clone(&client), file_name),
                Arc::clone(&progress),
                Arc::clone(&metrics),
                retry,
            )
            .with_resume(!fresh)
        })
        .collect();

    tracing::info!("Starting {} domain crawlers", config.domains.len());
    let max_concurrent = config.crawler.max_concurrent_fetches as usize;
    let outcomes = execute(crawlers, context, max_concurrent).await;

    Ok(CrawlReport::from_run(&metrics, outcomes, started.elapsed()))
}
