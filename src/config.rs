//! Export configuration
//!
//! The configuration file is plain JSON. Fields that are absent, zero or empty
//! fall back to the defaults below, so a minimal file only carries the access
//! token:
//!
//! ```json
//! { "access_token": "..." }
//! ```

use serde::Deserialize;
use std::net::SocketAddr;
use std::num::NonZeroU64;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Default number of records requested per page.
pub const DEFAULT_PAGE_SIZE: u64 = 1000;

/// Default per-worker pause between fetches, in seconds.
pub const DEFAULT_REQUEST_DELAY_SECS: f64 = 0.5;

/// Default output filename prefix.
pub const DEFAULT_OUTPUT_FILE_PREFIX: &str = "supplier_data";

/// Default worker pool size.
pub const DEFAULT_MAX_WORKERS: usize = 5;

/// Upper bound on the worker pool size.
/// Past this the pacing delay no longer protects the endpoint in any useful way.
pub const MAX_WORKERS_LIMIT: usize = 64;

/// Default query endpoint.
pub const DEFAULT_BASE_URL: &str = "https://one.cnncecp.com/cnnc-ps-api/";

/// Default overall HTTP request timeout, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Default configuration file name, resolved against the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file does not exist
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Configuration file exists but could not be read
    #[error("failed to read config file {}: {source}", .path.display())]
    Unreadable {
        /// Resolved file path
        path: PathBuf,
        /// Underlying IO error
        source: std::io::Error,
    },

    /// Configuration file is not valid JSON for the expected shape
    #[error("malformed config file: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Access token is absent or blank
    #[error("access_token is not set")]
    MissingAccessToken,

    /// A field holds a value outside its allowed range
    #[error("invalid value for {key}: {message}")]
    InvalidValue {
        /// Offending field name
        key: &'static str,
        /// What is wrong with it
        message: String,
    },
}

/// On-disk shape of the configuration file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    access_token: String,
    page_size: i64,
    request_delay: f64,
    output_file_prefix: String,
    max_workers: i64,
    base_url: String,
    request_timeout_secs: u64,
    metrics_addr: Option<SocketAddr>,
}

/// Validated export settings
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Token sent in the vendor authentication headers
    pub access_token: String,
    /// Records per page
    pub page_size: NonZeroU64,
    /// Pause each worker takes after every fetch
    pub request_delay: Duration,
    /// Prefix of the generated output filename
    pub output_file_prefix: String,
    /// Number of concurrent workers
    pub max_workers: usize,
    /// Query endpoint URL
    pub base_url: String,
    /// Overall timeout of one HTTP request
    pub request_timeout: Duration,
    /// Prometheus scrape endpoint, when metrics export is wanted
    pub metrics_addr: Option<SocketAddr>,
}

impl ExportConfig {
    /// Create a configuration with defaults for everything but the token.
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            page_size: NonZeroU64::new(DEFAULT_PAGE_SIZE).unwrap_or(NonZeroU64::MIN),
            request_delay: Duration::from_secs_f64(DEFAULT_REQUEST_DELAY_SECS),
            output_file_prefix: DEFAULT_OUTPUT_FILE_PREFIX.to_string(),
            max_workers: DEFAULT_MAX_WORKERS,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            metrics_addr: None,
        }
    }

    /// Load configuration from a JSON file.
    ///
    /// Relative paths are resolved against the current working directory.
    /// The access token is not required here; see [`ExportConfig::validate`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = resolve_path(path.as_ref());
        debug!(path = %path.display(), "Loading configuration");

        let data = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.clone())
            } else {
                ConfigError::Unreadable {
                    path: path.clone(),
                    source: e,
                }
            }
        })?;

        let config = Self::from_json(&data)?;
        info!(path = %path.display(), "Configuration loaded");
        Ok(config)
    }

    /// Parse configuration from a JSON string, applying defaults.
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(data)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, ConfigError> {
        let mut config = Self::new(raw.access_token.trim());

        match raw.page_size {
            0 => {}
            n if n < 0 => {
                return Err(ConfigError::InvalidValue {
                    key: "page_size",
                    message: format!("must be positive, got {n}"),
                })
            }
            n => {
                config.page_size = NonZeroU64::new(n as u64).unwrap_or(config.page_size);
            }
        }

        if !raw.request_delay.is_finite() || raw.request_delay < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "request_delay",
                message: format!("must be a non-negative number of seconds, got {}", raw.request_delay),
            });
        }
        if raw.request_delay > 0.0 {
            config.request_delay = Duration::try_from_secs_f64(raw.request_delay).map_err(|e| {
                ConfigError::InvalidValue {
                    key: "request_delay",
                    message: format!("{} seconds is out of range: {e}", raw.request_delay),
                }
            })?;
        }

        if !raw.output_file_prefix.is_empty() {
            config.output_file_prefix = raw.output_file_prefix;
        }

        match raw.max_workers {
            0 => {}
            n if n < 0 || n as usize > MAX_WORKERS_LIMIT => {
                return Err(ConfigError::InvalidValue {
                    key: "max_workers",
                    message: format!("must be between 1 and {MAX_WORKERS_LIMIT}, got {n}"),
                })
            }
            n => config.max_workers = n as usize,
        }

        if !raw.base_url.is_empty() {
            config.base_url = raw.base_url;
        }

        if raw.request_timeout_secs > 0 {
            config.request_timeout = Duration::from_secs(raw.request_timeout_secs);
        }

        config.metrics_addr = raw.metrics_addr;
        Ok(config)
    }

    /// Check that the configuration can drive a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token.trim().is_empty() {
            return Err(ConfigError::MissingAccessToken);
        }
        if self.max_workers == 0 || self.max_workers > MAX_WORKERS_LIMIT {
            return Err(ConfigError::InvalidValue {
                key: "max_workers",
                message: format!(
                    "must be between 1 and {MAX_WORKERS_LIMIT}, got {}",
                    self.max_workers
                ),
            });
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "base_url",
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Set page size
    pub fn with_page_size(mut self, page_size: NonZeroU64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set per-worker pacing delay
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Set worker pool size
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Set query endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set output filename prefix
    pub fn with_output_file_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_file_prefix = prefix.into();
        self
    }

    /// Token shortened for display, never the full secret.
    pub fn masked_token(&self) -> String {
        const VISIBLE: usize = 20;
        match self.access_token.char_indices().nth(VISIBLE) {
            Some((idx, _)) => format!("{}...", &self.access_token[..idx]),
            None => self.access_token.clone(),
        }
    }
}

fn resolve_path(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match std::env::current_dir() {
        Ok(dir) => dir.join(path),
        Err(_) => path.to_path_buf(),
    }
}
