//! Integration tests for logging and tracing setup

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[test]
fn test_tracing_json_format_initializes() {
    // Another test may have installed a subscriber first
    let _ = tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::new("supplier_export=info"))
        .with_test_writer()
        .try_init();

    info!(rows = 10, "structured field");
    warn!(page = 3, "page failed");
}

#[test]
fn test_env_filter_directives_parse() {
    for directive in ["info", "supplier_export=debug", "supplier_export::downloader=trace,warn"] {
        assert!(EnvFilter::try_new(directive).is_ok(), "{directive}");
    }
}
