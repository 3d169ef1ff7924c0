//! # Supplier Export Library
//!
//! Concurrent, paginated export of supplier records from a single remote
//! query endpoint into a CSV file.
//!
//! ## Features
//!
//! - **Count discovery**: one priming request reads the total record count
//! - **Page planning**: the count is split into fixed-size page requests
//! - **Worker pool**: pages are fetched concurrently with per-worker pacing
//! - **Incremental output**: rows are written and flushed page by page
//! - **Graceful cancellation**: Ctrl+C stops new fetches and keeps what was written
//!
//! ## Quick Start
//!
//! ```no_run
//! use supplier_export::config::ExportConfig;
//! use supplier_export::downloader::RunController;
//! use supplier_export::shutdown::ShutdownCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ExportConfig::load("config.json")?;
//! let shutdown = ShutdownCoordinator::shared();
//!
//! let mut controller = RunController::from_config(config, shutdown)?;
//! let summary = controller.run().await?;
//! println!("{} rows written", summary.total_rows_written);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`config`] - Configuration file loading, defaults and validation
//! - [`fetcher`] - Single page fetches against the vendor endpoint
//! - [`downloader`] - Page planning, task queue, worker pool, result sink and run controller
//! - [`output`] - CSV writer and output path helpers
//! - [`shutdown`] - Cancellation signal shared by every running task
//! - [`metrics`] - Counters and histograms for fetches and written rows
//!
//! Rows are written in the order pages complete, not in page order.

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// CLI command implementation
pub mod cli;

/// Configuration loading and validation
pub mod config;

/// Pagination engine: planning, queueing, workers, sink and controller
pub mod downloader;

/// Page fetchers
pub mod fetcher;

/// Observability metrics
pub mod metrics;

/// Data output writers
pub mod output;

/// Cancellation coordination shared across tasks
pub mod shutdown;

/// Marker prepended to every present cell so spreadsheets read it as text.
///
/// `null` cells are written as an empty field without the marker, which keeps
/// them distinguishable from empty strings (written as the marker alone).
pub const TEXT_MARKER: char = '\t';

/// Column schema of the supplier export, in output order.
pub const SUPPLIER_COLUMNS: [&str; 21] = [
    "supplierName",
    "unifiedSocialCode",
    "updateDate",
    "domesticForeignRelation",
    "companyType",
    "licenceEndDate",
    "updateUserName",
    "updateUser",
    "institutionType",
    "createUserName",
    "supplierCode",
    "contactsName",
    "contactsMobilephone",
    "licenceFromDate",
    "addressDetail",
    "offlineSupplier",
    "contactsMail",
    "createUser",
    "internalCode",
    "contactsTelephone",
    "createDate",
];

/// One exported row: opaque cells positionally aligned to the column schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Vec<Value>);

impl Record {
    /// Wrap a row of raw cells
    pub fn new(cells: Vec<Value>) -> Self {
        Self(cells)
    }

    /// Raw cells in column order
    pub fn cells(&self) -> &[Value] {
        &self.0
    }

    /// Number of cells in the row
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the row has no cells
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Coerce every cell to its output string.
    pub fn display_cells(&self) -> Vec<String> {
        self.0.iter().map(display_cell).collect()
    }
}

impl From<Vec<Value>> for Record {
    fn from(cells: Vec<Value>) -> Self {
        Self(cells)
    }
}

/// Coerce one cell to its output string.
///
/// `null` becomes an empty field; everything else is prefixed with
/// [`TEXT_MARKER`]. Nested arrays and objects are written as compact JSON.
pub fn display_cell(cell: &Value) -> String {
    let text = match cell {
        Value::Null => return String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => cell.to_string(),
    };
    format!("{TEXT_MARKER}{text}")
}
