//! Unbounded FIFO conduit from domain crawlers to the dispatcher

use crate::crawler::coordinator::{CompletionCoordinator, WorkUnit};
use crate::crawler::Repository;
use crate::CrawlerError;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A repository waiting for its fetch task, carrying its completion unit
pub struct QueuedRepository {
    pub repository: Repository,
    pub(crate) unit: WorkUnit,
}

/// Creates the repository queue and the coordinator that owns its closing
pub fn repository_queue() -> (Arc<CompletionCoordinator>, RepositoryReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (CompletionCoordinator::new(tx), RepositoryReceiver { rx })
}

/// Producer side of the queue, one per crawler
///
/// Dropping the sender releases the crawler's completion unit.
pub struct RepositorySender {
    tx: Option<mpsc::UnboundedSender<QueuedRepository>>,
    coordinator: Arc<CompletionCoordinator>,
}

impl RepositorySender {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<QueuedRepository>,
        coordinator: Arc<CompletionCoordinator>,
    ) -> Self {
        Self {
            tx: Some(tx),
            coordinator,
        }
    }

    /// Enqueues a repository
    ///
    /// The repository's unit is counted before it is sent, so the coordinator can
    /// never observe zero while an item sits in the queue.
    pub fn push(&self, repository: Repository) -> Result<(), CrawlerError> {
        let tx = self.tx.as_ref().ok_or(CrawlerError::QueueClosed)?;

        self.coordinator.acquire();
        let item = QueuedRepository {
            repository,
            unit: WorkUnit::adopt(Arc::clone(&self.coordinator)),
        };

        // A failed send hands the item back; dropping it releases the unit
        tx.send(item).map_err(|_| CrawlerError::QueueClosed)
    }
}

impl Drop for RepositorySender {
    fn drop(&mut self) {
        drop(self.tx.take());
        self.coordinator.release();
    }
}

/// Consumer side of the queue
pub struct RepositoryReceiver {
    rx: mpsc::UnboundedReceiver<QueuedRepository>,
}

impl RepositoryReceiver {
    /// Next repository, or `None` once the queue is closed and drained
    pub async fn recv(&mut self) -> Option<QueuedRepository> {
        self.rx.recv().await
    }
}
