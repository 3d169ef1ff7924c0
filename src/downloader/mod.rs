//! Pagination engine
//!
//! Turns one priming request into a full export:
//!
//! 1. **Priming**: fetch the first page to learn the total record count
//! 2. **Planning**: split the count into [`job::PageDescriptor`]s via [`job::PagePlan`]
//! 3. **Queueing**: fill a closable [`queue::TaskQueue`]
//! 4. **Fetching**: a [`worker::WorkerPool`] drains the queue, pacing each worker with [`rate_limit::Pacer`]
//! 5. **Writing**: a single [`sink::ResultSink`] writes rows as pages complete
//!
//! [`executor::RunController`] drives these steps and reports a [`job::RunSummary`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use supplier_export::config::ExportConfig;
//! use supplier_export::downloader::RunController;
//! use supplier_export::fetcher::HttpPageClient;
//! use supplier_export::shutdown::ShutdownCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExportConfig::new("token").with_max_workers(3);
//! let client = Arc::new(HttpPageClient::new(&config)?);
//!
//! let mut controller = RunController::new(config, client, ShutdownCoordinator::shared())
//!     .with_output_path("./suppliers.csv");
//! let summary = controller.run().await?;
//! println!("{} pages failed", summary.total_pages_failed);
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Page-level fetch failures never surface as errors: they are counted and
//! reported in the summary. Setup failures (configuration, priming, output
//! file) abort the run with an [`ExportError`]. Cancellation is not an error
//! either; the summary carries `cancelled: true`.

pub mod executor;
pub mod job;
pub mod progress;
pub mod queue;
pub mod rate_limit;
pub mod sink;
pub mod worker;

pub use executor::RunController;
pub use job::{PageDescriptor, PagePlan, PageResult, RunState, RunSummary, MAX_PLANNED_PAGES};
pub use progress::PageProgress;
pub use queue::{QueueClosed, TaskQueue};
pub use rate_limit::Pacer;
pub use sink::{ResultSink, SinkTotals};
pub use worker::{WorkerPool, WorkerStats};

use crate::config::ConfigError;
use crate::fetcher::FetcherError;
use crate::output::OutputError;

/// Run-level errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Configuration rejected before any request
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// HTTP client could not be built
    #[error("failed to create page client: {0}")]
    Client(FetcherError),

    /// Priming request failed
    #[error("priming request failed: {0}")]
    Priming(FetcherError),

    /// Priming response carried no record count
    #[error("priming response did not include a total record count")]
    MissingTotalCount,

    /// Advertised count needs more pages than a run accepts
    #[error("server reported {total_count} records ({total_pages} pages), above the limit of {limit} pages")]
    PlanTooLarge {
        /// Record count from the priming response
        total_count: u64,
        /// Pages the count would need
        total_pages: u64,
        /// [`job::MAX_PLANNED_PAGES`]
        limit: u64,
    },

    /// Output file could not be created or written
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// A background task panicked or was cancelled
    #[error("task failed: {0}")]
    Task(String),
}
