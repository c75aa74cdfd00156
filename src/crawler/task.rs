//! Fetch, save and validate one repository's manifest

use crate::crawler::fetcher::FetchClient;
use crate::crawler::persistence::FileStore;
use crate::crawler::queue::QueuedRepository;
use crate::crawler::validation::ValidationPipeline;
use crate::crawler::Repository;
use crate::metrics::{MetricsRegistry, REPOSITORY_PROCESSED};
use std::sync::Arc;

/// Everything a repository task needs
#[derive(Clone)]
pub struct TaskContext {
    pub client: Arc<dyn FetchClient>,
    pub files: FileStore,
    pub validation: ValidationPipeline,
    pub metrics: Arc<MetricsRegistry>,
}

/// Runs the task for a queued repository, releasing its completion unit at the end
pub async fn process_queued(item: QueuedRepository, context: &TaskContext) {
    let QueuedRepository { repository, unit } = item;
    process(&repository, context).await;
    drop(unit);
}

/// Fetches a repository's manifest, saves it and validates it
///
/// Failures only end this repository's work; they are logged and never returned.
pub async fn process(repository: &Repository, context: &TaskContext) {
    context.metrics.increment(REPOSITORY_PROCESSED);
    context.metrics.increment(&repository.domain);

    let response = match context
        .client
        .get(&repository.file_raw_url, &repository.headers)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            tracing::debug!("Fetch failed for {}: {}", repository.file_raw_url, e);
            return;
        }
    };

    if !response.is_ok() {
        tracing::debug!(
            "No {} for {} (HTTP {})",
            repository.file_raw_url,
            repository.name,
            response.status
        );
        return;
    }

    if let Err(e) = context
        .files
        .save(&repository.domain, &repository.name, &response.body)
        .await
    {
        tracing::error!("Could not save manifest of {}: {}", repository.name, e);
    }

    if let Err(e) = context
        .validation
        .validate(&response.body, &repository.file_raw_url)
    {
        tracing::warn!("Validator fails for: {}", repository.file_raw_url);
        tracing::warn!("Validator errors: {}", e);
    }
}
