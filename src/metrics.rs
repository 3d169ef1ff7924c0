//! Observability metrics for export runs
//!
//! Records page fetch latency and outcome, rows written and run outcomes
//! through the `metrics` facade. Nothing is exported unless
//! [`init_metrics`] installs the Prometheus scrape endpoint; without a
//! recorder the macros are no-ops.

use metrics::{
    counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Address the exporter was installed on, set once
static METRICS_ADDR: OnceCell<SocketAddr> = OnceCell::new();

/// Correlation ID generator for request tracing
static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Metrics setup errors
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// Exporter could not be installed
    #[error("failed to install Prometheus exporter on {addr}: {message}")]
    Install {
        /// Requested listen address
        addr: SocketAddr,
        /// Exporter error text
        message: String,
    },
}

/// Initialize metrics system with Prometheus exporter
///
/// Idempotent: a second call is a no-op returning `Ok(())`.
///
/// # Arguments
/// * `addr` - Socket address to bind the scrape endpoint (e.g., "127.0.0.1:9090")
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    if METRICS_ADDR.get().is_some() {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| MetricsError::Install {
            addr,
            message: e.to_string(),
        })?;

    describe_counter!(
        "page_requests_total",
        Unit::Count,
        "HTTP page requests by status"
    );
    describe_histogram!(
        "page_request_duration_seconds",
        Unit::Seconds,
        "Duration of one page request"
    );
    describe_counter!("pages_written_total", Unit::Count, "Pages written to the output file");
    describe_counter!("pages_failed_total", Unit::Count, "Pages dropped after a fetch failure");
    describe_counter!("rows_written_total", Unit::Count, "Rows written to the output file");
    describe_gauge!("export_total_count", Unit::Count, "Record count advertised by the server");
    describe_counter!("export_runs_total", Unit::Count, "Finished export runs by outcome");

    let _ = METRICS_ADDR.set(addr);
    info!(%addr, "Metrics system initialized");
    Ok(())
}

/// Whether the exporter has been installed
pub fn is_initialized() -> bool {
    METRICS_ADDR.get().is_some()
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Timing and outcome of one page request
pub struct FetchMetrics {
    offset: u64,
    start_time: Instant,
    correlation_id: String,
}

impl FetchMetrics {
    /// Start recording a page request
    pub fn start(offset: u64) -> Self {
        Self {
            offset,
            start_time: Instant::now(),
            correlation_id: generate_correlation_id(),
        }
    }

    /// Record a response with the given status
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!("page_requests_total", "status" => status_code.to_string()).increment(1);
        histogram!("page_request_duration_seconds").record(duration.as_secs_f64());

        debug!(
            correlation_id = %self.correlation_id,
            offset = self.offset,
            status = status_code,
            duration_ms = duration.as_millis(),
            "Page request completed"
        );
    }

    /// Record a request that never produced a status
    pub fn record_transport_error(&self) {
        let duration = self.start_time.elapsed();

        counter!("page_requests_total", "status" => "transport_error").increment(1);
        histogram!("page_request_duration_seconds").record(duration.as_secs_f64());

        warn!(
            correlation_id = %self.correlation_id,
            offset = self.offset,
            duration_ms = duration.as_millis(),
            "Page request transport error"
        );
    }

    /// Correlation ID of this request
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }
}

/// Record a page whose rows reached the output file
pub fn record_page_written(rows: usize) {
    counter!("pages_written_total").increment(1);
    counter!("rows_written_total").increment(rows as u64);
}

/// Record a page dropped because its fetch failed
pub fn record_page_failed(kind: &'static str) {
    counter!("pages_failed_total", "kind" => kind).increment(1);
}

/// Run-level metrics
pub struct RunMetrics {
    start_time: Instant,
}

impl Default for RunMetrics {
    fn default() -> Self {
        Self::start()
    }
}

impl RunMetrics {
    /// Start tracking a run
    pub fn start() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Record the count learned from the priming request
    pub fn record_total_count(&self, total_count: u64) {
        gauge!("export_total_count").set(total_count as f64);
    }

    /// Record a run that reached a summary
    pub fn record_finished(&self, cancelled: bool, rows_written: u64) {
        let outcome = if cancelled { "cancelled" } else { "completed" };
        counter!("export_runs_total", "outcome" => outcome).increment(1);

        info!(
            outcome,
            rows_written,
            duration_secs = self.start_time.elapsed().as_secs(),
            "Export run finished"
        );
    }

    /// Record a run that failed before producing a summary
    pub fn record_failure(&self, error: &str) {
        counter!("export_runs_total", "outcome" => "failed").increment(1);

        warn!(
            error = %error,
            duration_secs = self.start_time.elapsed().as_secs(),
            "Export run failed"
        );
    }
}
