//! Unit tests for per-worker pacing

use std::time::{Duration, Instant};
use supplier_export::downloader::Pacer;
use supplier_export::shutdown::ShutdownCoordinator;

#[tokio::test]
async fn test_pause_honours_delay() {
    let pacer = Pacer::new(Duration::from_millis(50));
    let shutdown = ShutdownCoordinator::new();

    let start = Instant::now();
    assert!(pacer.pause(&shutdown).await);
    assert!(start.elapsed() >= Duration::from_millis(50));
}

#[tokio::test]
async fn test_pause_skipped_after_shutdown() {
    let pacer = Pacer::new(Duration::from_secs(60));
    let shutdown = ShutdownCoordinator::new();
    shutdown.request_shutdown();

    let result = tokio::time::timeout(Duration::from_secs(1), pacer.pause(&shutdown)).await;
    assert_eq!(result, Ok(false));
}

#[test]
fn test_default_is_disabled() {
    assert_eq!(Pacer::default().delay(), Duration::ZERO);
}
