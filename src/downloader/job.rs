//! Page plan, per-page results and run summary

use crate::fetcher::{FetcherError, PageRequest};
use crate::Record;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;
use std::path::PathBuf;
use std::time::Duration;

/// One page to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageDescriptor {
    /// 1-based page number
    pub page_number: u64,
    /// Records to skip, always `(page_number - 1) * page_size`
    pub offset: u64,
}

impl PageDescriptor {
    /// Fetch window for this page
    pub fn request(&self, page_size: NonZeroU64) -> PageRequest {
        PageRequest {
            limit: page_size.get(),
            offset: self.offset,
        }
    }
}

/// Largest plan a run accepts; a larger advertised count fails the run
pub const MAX_PLANNED_PAGES: u64 = 1_000_000;

/// Split of a dataset into fixed-size pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PagePlan {
    /// Record count advertised by the server
    pub total_count: u64,
    /// Records per page
    pub page_size: u64,
    /// `ceil(total_count / page_size)`
    pub total_pages: u64,
}

impl PagePlan {
    /// Plan the pages covering `total_count` records
    pub fn new(total_count: u64, page_size: NonZeroU64) -> Self {
        Self {
            total_count,
            page_size: page_size.get(),
            total_pages: total_count.div_ceil(page_size.get()),
        }
    }

    /// Whether the plan fits under [`MAX_PLANNED_PAGES`]
    pub fn is_within_limit(&self) -> bool {
        self.total_pages <= MAX_PLANNED_PAGES
    }

    /// Whether there is nothing to fetch
    pub fn is_empty(&self) -> bool {
        self.total_pages == 0
    }

    /// Descriptors for pages `1..=total_pages`, in ascending order
    pub fn descriptors(&self) -> impl Iterator<Item = PageDescriptor> + Send + 'static {
        let page_size = self.page_size;
        (1..=self.total_pages).map(move |page_number| PageDescriptor {
            page_number,
            offset: (page_number - 1) * page_size,
        })
    }
}

/// Outcome of fetching one page, as delivered to the sink
#[derive(Debug, Clone, PartialEq)]
pub struct PageResult {
    /// Page that was fetched
    pub page_number: u64,
    /// Offset that was requested
    pub offset: u64,
    /// Rows on success, the classified failure otherwise
    pub outcome: Result<Vec<Record>, FetcherError>,
}

impl PageResult {
    /// Successful page
    pub fn success(descriptor: PageDescriptor, rows: Vec<Record>) -> Self {
        Self {
            page_number: descriptor.page_number,
            offset: descriptor.offset,
            outcome: Ok(rows),
        }
    }

    /// Failed page
    pub fn failure(descriptor: PageDescriptor, error: FetcherError) -> Self {
        Self {
            page_number: descriptor.page_number,
            offset: descriptor.offset,
            outcome: Err(error),
        }
    }

    /// Whether the fetch succeeded
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Lifecycle of one export run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RunState {
    /// Not started
    #[default]
    Init,
    /// Fetching the first page to learn the record count
    Priming,
    /// Computing the page plan
    Planning,
    /// Workers and sink are active
    Running,
    /// All planned pages were attempted
    Completed,
    /// Stopped early by a shutdown request
    Cancelled,
    /// Aborted by an error
    Failed,
}

impl RunState {
    /// Whether the run has ended
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

/// What a finished run produced
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Rows written to the output file
    pub total_rows_written: u64,
    /// Pages the plan asked for
    pub total_pages_requested: u64,
    /// Pages dropped because their fetch failed
    pub total_pages_failed: u64,
    /// Whether a shutdown request cut the run short
    pub cancelled: bool,
    /// Record count advertised by the server
    pub total_count: u64,
    /// Output file, `None` when nothing needed writing
    pub output_path: Option<PathBuf>,
    /// Wall-clock duration of the run
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl RunSummary {
    /// Advertised records that did not make it into the file
    pub fn missing_rows(&self) -> u64 {
        self.total_count.saturating_sub(self.total_rows_written)
    }

    /// Whether every planned page was written
    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.total_pages_failed == 0
    }
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}
