//! Page fetchers
//!
//! A [`PageClient`] performs exactly one page fetch per call: no retries, no
//! concurrency of its own. Concurrency and pacing belong to the worker pool.

use crate::Record;
use async_trait::async_trait;

pub mod http;
pub mod payload;

pub use http::HttpPageClient;
pub use payload::QueryTemplate;

/// Longest slice of a response body carried in an error, in characters.
pub const BODY_PREVIEW_CHARS: usize = 100;

/// Page fetch failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetcherError {
    /// Server answered with a non-2xx status
    #[error("server returned status {status}: {body_preview}")]
    HttpStatus {
        /// HTTP status code
        status: u16,
        /// Start of the response body
        body_preview: String,
    },

    /// Response body could not be decoded
    #[error("failed to decode response: {detail}, body: {body_preview}")]
    Decode {
        /// Decoder message
        detail: String,
        /// Start of the response body
        body_preview: String,
    },

    /// Network error or timeout
    #[error("transport error: {0}")]
    Transport(String),

    /// Request could not be built
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl FetcherError {
    /// Short label of the failure kind, used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            FetcherError::HttpStatus { .. } => "http_status",
            FetcherError::Decode { .. } => "decode",
            FetcherError::Transport(_) => "transport",
            FetcherError::InvalidRequest(_) => "invalid_request",
        }
    }
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Pagination window of one fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Maximum records to return
    pub limit: u64,
    /// Records to skip
    pub offset: u64,
}

/// Rows of one page, plus the dataset size when the server advertises it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResponse {
    /// Records of the requested page
    pub rows: Vec<Record>,
    /// Total record count across all pages, if present in the response
    pub total_count: Option<u64>,
}

/// Executes single page fetches
#[async_trait]
pub trait PageClient: Send + Sync {
    /// Fetch one page
    ///
    /// # Arguments
    /// * `request` - Limit and offset of the page
    ///
    /// # Returns
    /// Rows of the page and, when advertised, the total record count
    async fn fetch(&self, request: PageRequest) -> FetcherResult<PageResponse>;
}

/// Cut a response body down to [`BODY_PREVIEW_CHARS`] characters, marking truncation.
pub fn body_preview(body: &str) -> String {
    match body.char_indices().nth(BODY_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
