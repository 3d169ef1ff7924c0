//! CLI error types and conversions

use crate::config::ConfigError;
use crate::downloader::ExportError;
use crate::metrics::MetricsError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigurationError(#[from] ConfigError),

    /// Export run error
    #[error("export failed: {0}")]
    ExportError(#[from] ExportError),

    /// Metrics exporter error
    #[error("metrics error: {0}")]
    MetricsError(#[from] MetricsError),

    /// Summary could not be serialized
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
