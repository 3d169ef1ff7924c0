//! Run controller
//!
//! Drives one export through `Init → Priming → Planning → Running` and into
//! one of the terminal states. Every transition is logged.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinError;
use tracing::{debug, info, info_span, warn, Instrument};

use super::job::{PagePlan, RunState, RunSummary, MAX_PLANNED_PAGES};
use super::progress::PageProgress;
use super::queue::TaskQueue;
use super::rate_limit::Pacer;
use super::sink::ResultSink;
use super::worker::WorkerPool;
use super::ExportError;
use crate::config::ExportConfig;
use crate::fetcher::{HttpPageClient, PageClient, PageRequest};
use crate::metrics::RunMetrics;
use crate::output::{resolve_output_path, CsvRecordWriter};
use crate::shutdown::SharedShutdown;
use crate::SUPPLIER_COLUMNS;

/// Orchestrates priming, planning, the worker pool and the result sink
pub struct RunController {
    config: ExportConfig,
    client: Arc<dyn PageClient>,
    shutdown: SharedShutdown,
    output_path: Option<PathBuf>,
    columns: Vec<String>,
    show_progress: bool,
    state: RunState,
}

impl RunController {
    /// Create a controller around an existing page client
    pub fn new(
        config: ExportConfig,
        client: Arc<dyn PageClient>,
        shutdown: SharedShutdown,
    ) -> Self {
        Self {
            config,
            client,
            shutdown,
            output_path: None,
            columns: SUPPLIER_COLUMNS.iter().map(|c| c.to_string()).collect(),
            show_progress: false,
            state: RunState::Init,
        }
    }

    /// Create a controller talking HTTP to the configured endpoint
    ///
    /// # Errors
    /// Returns [`ExportError::Client`] if the HTTP client cannot be built
    /// from the configuration.
    pub fn from_config(
        config: ExportConfig,
        shutdown: SharedShutdown,
    ) -> Result<Self, ExportError> {
        let client = HttpPageClient::new(&config).map_err(ExportError::Client)?;
        Ok(Self::new(config, Arc::new(client), shutdown))
    }

    /// Write to `path` instead of a generated timestamped name
    pub fn with_output_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output_path = Some(path.into());
        self
    }

    /// Replace the header row
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Print per-page progress lines and a page bar
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Configuration the run uses
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Execute the run
    ///
    /// # Returns
    /// A [`RunSummary`] for completed and cancelled runs
    ///
    /// # Errors
    /// Configuration, priming and output failures end the run in
    /// [`RunState::Failed`]. No file is created when priming fails.
    pub async fn run(&mut self) -> Result<RunSummary, ExportError> {
        let span = info_span!(
            "export_run",
            base_url = %self.config.base_url,
            page_size = self.config.page_size.get(),
            workers = self.config.max_workers
        );

        let run_metrics = RunMetrics::start();
        let started = Instant::now();
        let result = self.execute(started, &run_metrics).instrument(span).await;

        match &result {
            Ok(summary) => {
                run_metrics.record_finished(summary.cancelled, summary.total_rows_written)
            }
            Err(e) => {
                self.transition(RunState::Failed);
                run_metrics.record_failure(&e.to_string());
            }
        }
        result
    }

    async fn execute(
        &mut self,
        started: Instant,
        run_metrics: &RunMetrics,
    ) -> Result<RunSummary, ExportError> {
        self.state = RunState::Init;
        info!(state = ?self.state, "Starting export run");
        self.config.validate()?;

        if self.shutdown.is_shutdown_requested() {
            return Ok(self.cancelled_before_planning(started));
        }

        self.transition(RunState::Priming);
        let request = PageRequest {
            limit: self.config.page_size.get(),
            offset: 0,
        };
        let client = self.client.clone();
        let shutdown = self.shutdown.clone();
        let priming = tokio::select! {
            biased;
            response = client.fetch(request) => response.map_err(ExportError::Priming)?,
            _ = shutdown.wait_for_shutdown() => {
                info!("Shutdown requested during priming request");
                return Ok(self.cancelled_before_planning(started));
            }
        };
        let total_count = priming.total_count.ok_or(ExportError::MissingTotalCount)?;
        run_metrics.record_total_count(total_count);

        if self.shutdown.is_shutdown_requested() {
            return Ok(self.cancelled_before_planning(started));
        }

        self.transition(RunState::Planning);
        let plan = PagePlan::new(total_count, self.config.page_size);
        info!(
            total_count = plan.total_count,
            total_pages = plan.total_pages,
            "Page plan computed"
        );
        if !plan.is_within_limit() {
            return Err(ExportError::PlanTooLarge {
                total_count,
                total_pages: plan.total_pages,
                limit: MAX_PLANNED_PAGES,
            });
        }
        self.announce(&plan);

        if plan.is_empty() {
            self.transition(RunState::Completed);
            return Ok(RunSummary {
                total_rows_written: 0,
                total_pages_requested: 0,
                total_pages_failed: 0,
                cancelled: false,
                total_count,
                output_path: None,
                elapsed: started.elapsed(),
            });
        }

        self.transition(RunState::Running);
        let output_path =
            resolve_output_path(self.output_path.as_deref(), &self.config.output_file_prefix);
        let headers: Vec<&str> = self.columns.iter().map(String::as_str).collect();
        let writer = CsvRecordWriter::create(&output_path, &headers)?;

        let queue = Arc::new(TaskQueue::new());
        let enqueued = queue.populate(&plan, &self.shutdown);
        debug!(enqueued, "Task queue ready");

        let pool = WorkerPool::new(
            self.config.max_workers,
            self.config.page_size,
            self.client.clone(),
            Pacer::new(self.config.request_delay),
            self.shutdown.clone(),
        );
        let (results, workers) = pool.spawn(queue);

        let progress = if self.show_progress {
            PageProgress::new(plan.total_pages)
        } else {
            PageProgress::silent()
        };
        let sink = tokio::spawn(
            ResultSink::new(writer, progress, self.shutdown.clone())
                .run(results)
                .in_current_span(),
        );

        let worker_stats = workers.await.map_err(task_error)?;
        let totals = sink.await.map_err(task_error)??;

        // A request landing after the last page was taken does not cancel
        // a run that fetched everything.
        let cancelled = worker_stats.dropped > 0 || (enqueued as u64) < plan.total_pages;
        if worker_stats.dropped > 0 {
            info!(dropped = worker_stats.dropped, "Pages abandoned after shutdown request");
        }

        self.transition(if cancelled {
            RunState::Cancelled
        } else {
            RunState::Completed
        });

        let summary = RunSummary {
            total_rows_written: totals.rows_written,
            total_pages_requested: plan.total_pages,
            total_pages_failed: totals.pages_failed,
            cancelled,
            total_count,
            output_path: Some(output_path),
            elapsed: started.elapsed(),
        };
        if summary.missing_rows() > 0 {
            warn!(
                missing_rows = summary.missing_rows(),
                fetches = worker_stats.fetches,
                "Fewer rows written than advertised"
            );
        }
        Ok(summary)
    }

    fn transition(&mut self, next: RunState) {
        info!(from = ?self.state, to = ?next, "Run state changed");
        self.state = next;
    }

    fn cancelled_before_planning(&mut self, started: Instant) -> RunSummary {
        self.transition(RunState::Cancelled);
        RunSummary {
            total_rows_written: 0,
            total_pages_requested: 0,
            total_pages_failed: 0,
            cancelled: true,
            total_count: 0,
            output_path: None,
            elapsed: started.elapsed(),
        }
    }

    fn announce(&self, plan: &PagePlan) {
        if self.show_progress {
            println!("\u{2713} Total records reported by server: {}", plan.total_count);
            println!("\u{2713} Pages to fetch: {}", plan.total_pages);
        }
    }
}

fn task_error(e: JoinError) -> ExportError {
    ExportError::Task(e.to_string())
}
