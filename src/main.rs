//! Main entry point for the supplier-export CLI

use clap::Parser;
use supplier_export::cli::Cli;
use supplier_export::shutdown::{install_signal_handler, ShutdownCoordinator};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
///
/// Logs go to stderr; stdout carries progress lines and the summary.
fn init_tracing() {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("supplier_export=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let shutdown = ShutdownCoordinator::shared();
    install_signal_handler(shutdown.clone());

    let result = cli
        .execute(shutdown)
        .await
        .map(|_| ())
        .map_err(|e| anyhow::anyhow!(e));

    if let Err(e) = result {
        error!("Export failed: {:#}", e);
        std::process::exit(1);
    }
}
