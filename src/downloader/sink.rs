//! Result sink
//!
//! The single consumer of the worker pool's result channel. It owns the
//! output writer for the whole run, so rows are never interleaved.

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::job::PageResult;
use super::progress::PageProgress;
use crate::metrics;
use crate::output::{OutputResult, RecordWriter};
use crate::shutdown::SharedShutdown;

/// Totals accumulated by the sink
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkTotals {
    /// Rows written to the output
    pub rows_written: u64,
    /// Successful pages, including empty ones
    pub pages_written: u64,
    /// Pages dropped after a fetch failure
    pub pages_failed: u64,
}

/// Writes every successful page and counts the failed ones
pub struct ResultSink<W: RecordWriter> {
    writer: W,
    progress: PageProgress,
    shutdown: SharedShutdown,
    totals: SinkTotals,
}

impl<W: RecordWriter> ResultSink<W> {
    /// Create a sink around an open writer
    pub fn new(writer: W, progress: PageProgress, shutdown: SharedShutdown) -> Self {
        Self {
            writer,
            progress,
            shutdown,
            totals: SinkTotals::default(),
        }
    }

    /// Consume results until every sender is gone, then close the writer
    ///
    /// # Errors
    /// An output failure requests shutdown, so workers stop picking up pages,
    /// and is returned as is. The channel is dropped with the sink.
    pub async fn run(
        mut self,
        mut results: mpsc::Receiver<PageResult>,
    ) -> OutputResult<SinkTotals> {
        while let Some(result) = results.recv().await {
            if let Err(e) = self.accept(result) {
                error!(error = %e, "Output failed, stopping run");
                self.shutdown.request_shutdown();
                self.progress.finish();
                return Err(e);
            }
        }

        self.progress.finish();
        let totals = self.totals;
        self.writer.close()?;

        info!(
            rows_written = totals.rows_written,
            pages_written = totals.pages_written,
            pages_failed = totals.pages_failed,
            "Result sink finished"
        );
        Ok(totals)
    }

    fn accept(&mut self, result: PageResult) -> OutputResult<()> {
        match result.outcome {
            Ok(rows) => {
                self.writer.write_records(&rows)?;
                self.writer.flush()?;

                self.totals.rows_written += rows.len() as u64;
                self.totals.pages_written += 1;
                metrics::record_page_written(rows.len());
                debug!(page = result.page_number, rows = rows.len(), "Page written");
                self.progress
                    .page_written(result.page_number, result.offset, rows.len());
            }
            Err(e) => {
                self.totals.pages_failed += 1;
                metrics::record_page_failed(e.kind());
                self.progress.page_failed(result.page_number, &e);
            }
        }
        Ok(())
    }
}
