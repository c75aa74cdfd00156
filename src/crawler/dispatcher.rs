//! Queue consumer that fans repositories out to tasks
//!
//! Every received repository gets its own task, but at most `max_concurrent` tasks
//! run at once; the dispatcher waits for a free slot before spawning the next one.

use crate::crawler::queue::RepositoryReceiver;
use crate::crawler::task::{process_queued, TaskContext};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};

pub struct Dispatcher {
    context: Arc<TaskContext>,
    semaphore: Arc<Semaphore>,
}

impl Dispatcher {
    pub fn new(context: Arc<TaskContext>, max_concurrent: usize) -> Self {
        Self {
            context,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Drains the queue until it is closed, then waits for the remaining tasks
    ///
    /// Returns the number of tasks spawned.
    pub async fn dispatch(&self, mut queue: RepositoryReceiver) -> usize {
        tracing::debug!("Repositories are going to be processed...");

        let mut tasks = JoinSet::new();
        let mut spawned = 0usize;

        while let Some(item) = queue.recv().await {
            let Ok(permit) = Arc::clone(&self.semaphore).acquire_owned().await else {
                tracing::error!("Task semaphore closed, stopping dispatch");
                break;
            };

            let context = Arc::clone(&self.context);
            tasks.spawn(async move {
                let _permit = permit;
                process_queued(item, &context).await;
            });
            spawned += 1;

            while let Some(result) = tasks.try_join_next() {
                log_join(result);
            }
        }

        while let Some(result) = tasks.join_next().await {
            log_join(result);
        }

        tracing::debug!("Dispatcher finished after {} repositories", spawned);
        spawned
    }
}

fn log_join(result: Result<(), JoinError>) {
    if let Err(e) = result {
        tracing::error!("Repository task failed: {}", e);
    }
}
