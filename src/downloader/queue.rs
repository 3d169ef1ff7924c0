//! Closable queue of page descriptors
//!
//! Filled once from a [`PagePlan`] and drained by the worker pool. Every
//! descriptor is handed to exactly one caller of [`TaskQueue::next`]. Once
//! closed the queue accepts nothing new, but what is already queued stays
//! available until drained.

use futures_util::stream::{self, Stream};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::{debug, info};

use super::job::{PageDescriptor, PagePlan};
use crate::shutdown::ShutdownCoordinator;

/// Returned by [`TaskQueue::enqueue`] after [`TaskQueue::close`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("task queue is closed")]
pub struct QueueClosed;

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<PageDescriptor>,
    closed: bool,
}

/// FIFO queue of page descriptors shared by the population task and workers
#[derive(Debug, Default)]
pub struct TaskQueue {
    state: Mutex<QueueState>,
    available: Notify,
}

impl TaskQueue {
    /// Create an empty, open queue
    pub fn new() -> Self {
        Self::default()
    }

    // Critical sections never panic, but a poisoned lock still holds
    // consistent data.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a descriptor
    ///
    /// # Errors
    /// Returns [`QueueClosed`] once [`TaskQueue::close`] has been called.
    pub fn enqueue(&self, descriptor: PageDescriptor) -> Result<(), QueueClosed> {
        {
            let mut state = self.lock();
            if state.closed {
                return Err(QueueClosed);
            }
            state.items.push_back(descriptor);
        }
        self.available.notify_waiters();
        Ok(())
    }

    /// Stop accepting descriptors. Idempotent.
    pub fn close(&self) {
        self.lock().closed = true;
        self.available.notify_waiters();
    }

    /// Whether [`TaskQueue::close`] has been called
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Descriptors currently waiting
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    /// Whether no descriptor is waiting
    pub fn is_empty(&self) -> bool {
        self.lock().items.is_empty()
    }

    /// Take the next descriptor
    ///
    /// Waits while the queue is open and empty. Returns `None` once the queue
    /// is closed and empty.
    pub async fn next(&self) -> Option<PageDescriptor> {
        loop {
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.lock();
                if let Some(descriptor) = state.items.pop_front() {
                    return Some(descriptor);
                }
                if state.closed {
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Lazy single-pass stream over the remaining descriptors
    ///
    /// Items taken by the stream are gone for every other consumer.
    pub fn drain(&self) -> impl Stream<Item = PageDescriptor> + '_ {
        stream::unfold(self, |queue| async move {
            queue.next().await.map(|descriptor| (descriptor, queue))
        })
    }

    /// Enqueue the plan's descriptors in ascending order, then close
    ///
    /// Stops early when shutdown has been requested; descriptors already
    /// enqueued stay in the queue.
    ///
    /// # Returns
    /// Number of descriptors enqueued
    pub fn populate(&self, plan: &PagePlan, shutdown: &ShutdownCoordinator) -> usize {
        let mut enqueued = 0;
        for descriptor in plan.descriptors() {
            if shutdown.is_shutdown_requested() {
                info!(
                    enqueued,
                    total_pages = plan.total_pages,
                    "Shutdown requested, stopping queue population"
                );
                break;
            }
            if self.enqueue(descriptor).is_err() {
                debug!(page = descriptor.page_number, "Queue closed during population");
                break;
            }
            enqueued += 1;
        }
        self.close();
        debug!(enqueued, "Queue populated and closed");
        enqueued
    }
}
