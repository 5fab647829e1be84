//! Bounded fan-out shared by the chunk, file and escalation stages

use futures_util::stream::{self, StreamExt};
use std::future::Future;
use std::time::Instant;
use tracing::debug;

/// A bounded set of concurrent workers.
///
/// `drain` keeps at most `workers` tasks in flight and only returns once every
/// submitted task has finished. Results come back in completion order; callers
/// that need a stable order tag their tasks and sort afterwards.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    name: &'static str,
    workers: usize,
}

impl WorkerPool {
    pub fn new(name: &'static str, workers: usize) -> Self {
        Self {
            name,
            workers: workers.max(1),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub async fn drain<I, F, T>(&self, tasks: I) -> Vec<T>
    where
        I: IntoIterator<Item = F>,
        F: Future<Output = T>,
    {
        let start = Instant::now();
        let results: Vec<T> = stream::iter(tasks)
            .buffer_unordered(self.workers)
            .collect()
            .await;

        debug!(
            pool = self.name,
            workers = self.workers,
            tasks = results.len(),
            "Pool drained in {:?}",
            start.elapsed()
        );

        results
    }
}
