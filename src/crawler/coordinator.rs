//! Completion tracking for crawlers and repository tasks
//!
//! The coordinator counts outstanding units of work:
//! - one launch unit, held until every crawler has been started
//! - one unit per registered crawler (producer), released when its sender is dropped
//! - one unit per queued repository, released when its task finishes
//!
//! When the count reaches zero the master queue sender is dropped and the closed flag
//! is published. Both happen once, from whichever release observed the transition.

use crate::crawler::queue::{QueuedRepository, RepositorySender};
use crate::CrawlerError;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};

pub struct CompletionCoordinator {
    outstanding: AtomicUsize,
    launched: AtomicBool,
    master: Mutex<Option<mpsc::UnboundedSender<QueuedRepository>>>,
    closed_tx: watch::Sender<bool>,
    closed_rx: watch::Receiver<bool>,
}

impl CompletionCoordinator {
    pub(crate) fn new(master: mpsc::UnboundedSender<QueuedRepository>) -> Arc<Self> {
        let (closed_tx, closed_rx) = watch::channel(false);
        Arc::new(Self {
            outstanding: AtomicUsize::new(1),
            launched: AtomicBool::new(false),
            master: Mutex::new(Some(master)),
            closed_tx,
            closed_rx,
        })
    }

    /// Registers a crawler and hands it a sender onto the queue
    ///
    /// Fails once the queue has been closed.
    pub fn register_producer(self: &Arc<Self>) -> Result<RepositorySender, CrawlerError> {
        let guard = self.master.lock().unwrap_or_else(|e| e.into_inner());
        let master = guard.as_ref().ok_or(CrawlerError::QueueClosed)?;
        // Taken under the lock so a concurrent close cannot slip in between
        self.acquire();
        Ok(RepositorySender::new(master.clone(), Arc::clone(self)))
    }

    /// Releases the launch unit; further calls are ignored
    pub fn launch_complete(&self) {
        if !self.launched.swap(true, Ordering::SeqCst) {
            tracing::debug!("All crawlers launched");
            self.release();
        }
    }

    /// Number of outstanding units
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        *self.closed_rx.borrow()
    }

    /// Resolves once the queue has been closed
    pub async fn wait_closed(&self) {
        let mut rx = self.closed_rx.clone();
        // Only fails if the sender is gone, and the sender lives in `self`
        let _ = rx.wait_for(|closed| *closed).await;
    }

    pub(crate) fn acquire(&self) {
        self.outstanding.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn release(&self) {
        match self
            .outstanding
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(1) => self.close(),
            Ok(_) => {}
            Err(_) => tracing::error!("Completion counter released more often than acquired"),
        }
    }

    fn close(&self) {
        let master = self
            .master
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        if master.is_some() {
            tracing::debug!("No outstanding work left, closing repository queue");
            drop(master);
            self.closed_tx.send_replace(true);
        }
    }
}

/// One counted unit of work, released on drop
pub struct WorkUnit {
    coordinator: Arc<CompletionCoordinator>,
}

impl WorkUnit {
    /// Wraps a unit that has already been counted
    pub(crate) fn adopt(coordinator: Arc<CompletionCoordinator>) -> Self {
        Self { coordinator }
    }
}

impl Drop for WorkUnit {
    fn drop(&mut self) {
        self.coordinator.release();
    }
}
