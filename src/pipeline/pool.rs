use std::future::Future;
use tokio::task::JoinSet;
use tracing::{debug, error};

/// A fixed set of symmetric worker tasks joined through a single barrier.
pub struct WorkerPool {
    name: &'static str,
    workers: JoinSet<()>,
    size: usize,
}

impl WorkerPool {
    /// Spawn `size` workers; `make_worker` receives the worker index, which is
    /// only used for logging.
    pub fn spawn<F, Fut>(name: &'static str, size: usize, mut make_worker: F) -> Self
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut workers = JoinSet::new();
        for id in 0..size {
            workers.spawn(make_worker(id));
        }
        debug!(pool = name, size, "Worker pool started");

        Self {
            name,
            workers,
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Barrier: returns once every worker has exited. A panicking worker is
    /// logged and does not stop the wait for the others.
    pub async fn wait(mut self) -> usize {
        let mut panicked = 0;
        while let Some(result) = self.workers.join_next().await {
            if let Err(e) = result {
                panicked += 1;
                error!(pool = self.name, error = %e, "Worker task failed");
            }
        }
        debug!(pool = self.name, size = self.size, "Worker pool drained");
        panicked
    }
}
