//! Per-worker request pacing
//!
//! Each worker waits a fixed delay after every fetch. There is no global
//! limiter: aggregate throughput scales with the pool size.

use std::time::Duration;
use tokio::time::sleep;

use crate::shutdown::ShutdownCoordinator;

/// Fixed pause taken by a worker between consecutive fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    delay: Duration,
}

impl Pacer {
    /// Create a pacer with the given delay
    ///
    /// # Arguments
    /// * `delay` - Pause after each fetch; zero disables pacing
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Pacer that never waits
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Configured delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleep for the delay unless shutdown is requested first
    ///
    /// # Returns
    /// `true` if the full delay elapsed, `false` if shutdown cut it short
    pub async fn pause(&self, shutdown: &ShutdownCoordinator) -> bool {
        if shutdown.is_shutdown_requested() {
            return false;
        }
        if self.delay.is_zero() {
            return true;
        }

        tokio::select! {
            _ = sleep(self.delay) => true,
            _ = shutdown.wait_for_shutdown() => false,
        }
    }
}

impl Default for Pacer {
    fn default() -> Self {
        Self::disabled()
    }
}
