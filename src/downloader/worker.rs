//! Worker pool
//!
//! A fixed number of workers pull descriptors from the shared [`TaskQueue`],
//! fetch each page through the [`PageClient`] and send one [`PageResult`] per
//! fetch to the result channel. Results arrive in completion order.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info_span, warn, Instrument};

use super::job::PageResult;
use super::queue::TaskQueue;
use super::rate_limit::Pacer;
use crate::fetcher::PageClient;
use crate::shutdown::SharedShutdown;

/// Counters reported once every worker has exited
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    /// Fetches started across all workers
    pub fetches: u64,
    /// Descriptors pulled but abandoned because shutdown was requested
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct SharedStats {
    fetches: AtomicU64,
    dropped: AtomicU64,
}

/// Fixed-size pool of page workers
pub struct WorkerPool {
    size: usize,
    page_size: NonZeroU64,
    client: Arc<dyn PageClient>,
    pacer: Pacer,
    shutdown: SharedShutdown,
}

impl WorkerPool {
    /// Create a pool
    ///
    /// # Arguments
    /// * `size` - Number of workers, at least one is always spawned
    /// * `page_size` - Limit sent with every fetch
    /// * `client` - Shared page client
    /// * `pacer` - Delay each worker takes after a fetch
    /// * `shutdown` - Cancellation signal
    pub fn new(
        size: usize,
        page_size: NonZeroU64,
        client: Arc<dyn PageClient>,
        pacer: Pacer,
        shutdown: SharedShutdown,
    ) -> Self {
        Self {
            size: size.max(1),
            page_size,
            client,
            pacer,
            shutdown,
        }
    }

    /// Number of workers the pool spawns
    pub fn size(&self) -> usize {
        self.size
    }

    /// Spawn the workers against `queue`
    ///
    /// # Returns
    /// The result channel, bounded by the pool size, and a handle resolving
    /// to the pool's [`WorkerStats`] after every worker has exited. The
    /// channel closes when the last worker drops its sender.
    pub fn spawn(
        self,
        queue: Arc<TaskQueue>,
    ) -> (mpsc::Receiver<PageResult>, JoinHandle<WorkerStats>) {
        let (tx, rx) = mpsc::channel(self.size);
        let stats = Arc::new(SharedStats::default());

        let workers: Vec<JoinHandle<()>> = (0..self.size)
            .map(|worker_id| {
                let worker = Worker {
                    id: worker_id,
                    page_size: self.page_size,
                    client: self.client.clone(),
                    pacer: self.pacer,
                    shutdown: self.shutdown.clone(),
                    queue: queue.clone(),
                    results: tx.clone(),
                    stats: stats.clone(),
                };
                tokio::spawn(worker.run().instrument(info_span!("worker", id = worker_id)))
            })
            .collect();
        drop(tx);

        let handle = tokio::spawn(async move {
            for worker in workers {
                if let Err(e) = worker.await {
                    warn!(error = %e, "Worker task ended abnormally");
                }
            }
            WorkerStats {
                fetches: stats.fetches.load(Ordering::Relaxed),
                dropped: stats.dropped.load(Ordering::Relaxed),
            }
        });

        (rx, handle)
    }
}

struct Worker {
    id: usize,
    page_size: NonZeroU64,
    client: Arc<dyn PageClient>,
    pacer: Pacer,
    shutdown: SharedShutdown,
    queue: Arc<TaskQueue>,
    results: mpsc::Sender<PageResult>,
    stats: Arc<SharedStats>,
}

impl Worker {
    async fn run(self) {
        debug!("Worker started");

        while let Some(descriptor) = self.queue.next().await {
            if self.shutdown.is_shutdown_requested() {
                self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(page = descriptor.page_number, "Shutdown requested, dropping page");
                break;
            }

            self.stats.fetches.fetch_add(1, Ordering::Relaxed);
            let fetched = tokio::select! {
                biased;
                fetched = self.client.fetch(descriptor.request(self.page_size)) => fetched,
                _ = self.shutdown.wait_for_shutdown() => {
                    self.stats.dropped.fetch_add(1, Ordering::Relaxed);
                    debug!(page = descriptor.page_number, "Shutdown requested, abandoning fetch");
                    break;
                }
            };
            let result = match fetched {
                Ok(page) => PageResult::success(descriptor, page.rows),
                Err(e) => {
                    warn!(
                        page = descriptor.page_number,
                        offset = descriptor.offset,
                        kind = e.kind(),
                        error = %e,
                        "Page fetch failed"
                    );
                    PageResult::failure(descriptor, e)
                }
            };

            if self.results.send(result).await.is_err() {
                debug!("Result channel closed, stopping");
                break;
            }

            if !self.pacer.pause(&self.shutdown).await {
                debug!("Pause interrupted by shutdown");
            }
        }

        debug!(worker = self.id, "Worker exited");
    }
}
