//! Per-domain pagination loop
//!
//! A crawler walks one domain's listing a page at a time:
//! 1. The page URL is checkpointed as `failed` before it is fetched
//! 2. The page is handed to the domain's listing delegate
//! 3. Discovered repositories are pushed onto the shared queue
//! 4. The checkpoint is removed and the crawler moves to the next page
//!
//! Failed pages are retried on the same URL with exponential backoff. Once the retry
//! budget is spent the checkpoint is left in place so the next run resumes there.

use crate::config::{CrawlerConfig, DomainConfig};
use crate::crawler::queue::RepositorySender;
use crate::listing::PageProcessor;
use crate::metrics::{MetricsRegistry, PAGINATION_ABANDONED};
use crate::storage::{ProgressStatus, ProgressStore};
use std::sync::Arc;
use std::time::Duration;

/// Retry budget for a single listing page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            max_attempts: config.pagination_max_attempts,
            initial_backoff: Duration::from_millis(config.pagination_initial_backoff),
            max_backoff: Duration::from_millis(config.pagination_max_backoff),
        }
    }

    /// Delay before retrying after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
        }
    }
}

/// How a domain crawl ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// The last page was reached
    Completed { pages: usize, repositories: usize },
    /// A page kept failing; its URL stays checkpointed as `failed`
    Abandoned { url: String, attempts: u32 },
}

pub struct DomainCrawler {
    domain: DomainConfig,
    processor: Arc<dyn PageProcessor>,
    progress: Arc<dyn ProgressStore>,
    metrics: Arc<MetricsRegistry>,
    retry: RetryPolicy,
    resume: bool,
}

impl DomainCrawler {
    pub fn new(
        domain: DomainConfig,
        processor: Arc<dyn PageProcessor>,
        progress: Arc<dyn ProgressStore>,
        metrics: Arc<MetricsRegistry>,
        retry: RetryPolicy,
    ) -> Self {
        metrics.register_counter(
            &domain.id,
            &format!("Number of repository processed for {}.", domain.id),
        );

        Self {
            domain,
            processor,
            progress,
            metrics,
            retry,
            resume: true,
        }
    }

    /// Whether to start from a leftover `failed` checkpoint (default) or the first page
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn domain_id(&self) -> &str {
        &self.domain.id
    }

    /// URL the crawl starts from
    pub fn start_url(&self) -> String {
        if self.resume {
            match self.progress.resume_point(&self.domain.id) {
                Ok(Some(url)) => {
                    tracing::info!("Resuming {} from checkpoint {}", self.domain.id, url);
                    return url;
                }
                Ok(None) => {}
                Err(e) => tracing::error!(
                    "Could not read checkpoint for {}, starting over: {}",
                    self.domain.id,
                    e
                ),
            }
        }
        self.domain.url.clone()
    }

    /// Walks the domain's listing until the last page or until a page is abandoned
    ///
    /// The queue sender is dropped on return, which releases this crawler's
    /// completion unit.
    pub async fn run(self, queue: RepositorySender) -> CrawlOutcome {
        let domain_id = self.domain.id.as_str();
        let mut url = self.start_url();
        let mut attempt = 0u32;
        let mut pages = 0usize;
        let mut repositories = 0usize;

        tracing::info!("Crawling {} starting at {}", domain_id, url);

        loop {
            self.checkpoint(&url);

            let page = match self.processor.process_page(&url).await {
                Ok(page) => page,
                Err(e) => {
                    attempt += 1;
                    tracing::error!("Error reading {} repository list: {}", url, e);

                    if attempt >= self.retry.max_attempts {
                        tracing::error!(
                            "Giving up on {} after {} attempts, checkpoint kept at {}",
                            domain_id,
                            attempt,
                            url
                        );
                        self.metrics.increment(PAGINATION_ABANDONED);
                        return CrawlOutcome::Abandoned { url, attempts: attempt };
                    }

                    let delay = self.retry.delay_for(attempt);
                    tracing::warn!(
                        "Retrying {} in {:?} (attempt {}/{})",
                        url,
                        delay,
                        attempt + 1,
                        self.retry.max_attempts
                    );
                    tokio::time::sleep(delay).await;
                    continue;
                }
            };

            attempt = 0;
            pages += 1;

            for repository in page.repositories {
                match queue.push(repository) {
                    Ok(()) => repositories += 1,
                    Err(e) => tracing::error!("Could not enqueue repository from {}: {}", url, e),
                }
            }

            if let Err(e) = self.progress.clear_status(domain_id, &url) {
                tracing::error!("Could not clear checkpoint {} for {}: {}", url, domain_id, e);
            }

            match page.next_url.filter(|next| !next.is_empty()) {
                None => {
                    tracing::info!("Url: {} - is the last one.", url);
                    break;
                }
                Some(next) if next == url => {
                    tracing::warn!("Listing at {} points to itself, stopping", url);
                    break;
                }
                Some(next) => url = next,
            }
        }

        tracing::info!(
            "Finished {}: {} pages, {} repositories",
            domain_id,
            pages,
            repositories
        );
        CrawlOutcome::Completed {
            pages,
            repositories,
        }
    }

    fn checkpoint(&self, url: &str) {
        if let Err(e) = self
            .progress
            .set_status(&self.domain.id, url, ProgressStatus::Failed)
        {
            tracing::error!("Could not checkpoint {} for {}: {}", url, self.domain.id, e);
        }
    }
}
