//! End-to-end tests for export runs

use serde_json::{json, Value};
use std::collections::HashSet;
use std::num::NonZeroU64;
use std::sync::Arc;
use std::time::{Duration, Instant};
use supplier_export::config::ExportConfig;
use supplier_export::downloader::{ExportError, RunController, RunState};
use supplier_export::fetcher::FetcherError;
use supplier_export::output::csv::strip_marker;
use supplier_export::output::read_records;
use supplier_export::shutdown::ShutdownCoordinator;
use supplier_export::SUPPLIER_COLUMNS;
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use crate::support::fake_client::FakeClient;

fn config(page_size: u64, workers: usize) -> ExportConfig {
    ExportConfig::new("token")
        .with_page_size(NonZeroU64::new(page_size).unwrap())
        .with_max_workers(workers)
        .with_request_delay(Duration::ZERO)
}

#[tokio::test]
async fn test_full_run_writes_every_record() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("suppliers.csv");
    let client = FakeClient::new(2500);

    let mut controller =
        RunController::new(config(1000, 3), Arc::new(client.clone()), ShutdownCoordinator::shared())
            .with_output_path(&output);
    let summary = controller.run().await.unwrap();

    assert_eq!(controller.state(), RunState::Completed);
    assert_eq!(summary.total_rows_written, 2500);
    assert_eq!(summary.total_pages_requested, 3);
    assert_eq!(summary.total_pages_failed, 0);
    assert!(!summary.cancelled);
    assert_eq!(summary.output_path.as_deref(), Some(output.as_path()));

    // Priming request first, then each page exactly once
    assert_eq!(client.calls()[0].offset, 0);
    let mut offsets = client.page_offsets();
    offsets.sort_unstable();
    assert_eq!(offsets, vec![0, 1000, 2000]);

    let (header, rows) = read_records(&output).unwrap();
    assert_eq!(header, SUPPLIER_COLUMNS);
    assert_eq!(rows.len(), 2500);
    let names: HashSet<&str> = rows.iter().map(|r| strip_marker(&r[0])).collect();
    assert_eq!(names.len(), 2500);
    assert!(names.contains("Supplier 2499"));
}

#[tokio::test]
async fn test_custom_columns_replace_header() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("narrow.csv");

    let mut controller =
        RunController::new(config(10, 1), Arc::new(FakeClient::new(5)), ShutdownCoordinator::shared())
            .with_output_path(&output)
            .with_columns(["name", "code"]);
    controller.run().await.unwrap();

    let (header, rows) = read_records(&output).unwrap();
    assert_eq!(header, vec!["name", "code"]);
    assert_eq!(rows.len(), 5);
}

#[tokio::test]
async fn test_failed_pages_are_counted_not_retried() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("partial.csv");
    let client = FakeClient::new(2500).failing_at(1000);

    let mut controller =
        RunController::new(config(1000, 2), Arc::new(client.clone()), ShutdownCoordinator::shared())
            .with_output_path(&output);
    let summary = controller.run().await.unwrap();

    assert_eq!(summary.total_rows_written, 1500);
    assert_eq!(summary.total_pages_failed, 1);
    assert_eq!(summary.missing_rows(), 1000);
    assert!(!summary.cancelled);
    assert_eq!(client.page_offsets().iter().filter(|o| **o == 1000).count(), 1);

    let (_, rows) = read_records(&output).unwrap();
    assert_eq!(rows.len(), 1500);
}

#[tokio::test]
async fn test_zero_records_creates_no_file() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("empty.csv");

    let mut controller =
        RunController::new(config(1000, 5), Arc::new(FakeClient::new(0)), ShutdownCoordinator::shared())
            .with_output_path(&output);
    let summary = controller.run().await.unwrap();

    assert_eq!(summary.total_rows_written, 0);
    assert_eq!(summary.total_pages_requested, 0);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_priming_failure_creates_no_file() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("never.csv");
    let client = FakeClient::new(2500).failing_priming();

    let mut controller =
        RunController::new(config(1000, 3), Arc::new(client.clone()), ShutdownCoordinator::shared())
            .with_output_path(&output);
    let err = controller.run().await.unwrap_err();

    assert!(matches!(
        err,
        ExportError::Priming(FetcherError::HttpStatus { status: 502, .. })
    ));
    assert_eq!(controller.state(), RunState::Failed);
    assert_eq!(client.calls().len(), 1);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_missing_count_fails_priming() {
    let mut controller = RunController::new(
        config(1000, 3),
        Arc::new(FakeClient::without_count()),
        ShutdownCoordinator::shared(),
    );
    assert!(matches!(controller.run().await, Err(ExportError::MissingTotalCount)));
}

#[tokio::test]
async fn test_cancellation_mid_run_keeps_written_pages() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("cancelled.csv");
    let shutdown = ShutdownCoordinator::shared();
    let client = FakeClient::new(10_000)
        .with_latency(Duration::from_millis(5))
        .shutdown_after(6, shutdown.clone());

    let mut controller = RunController::new(config(100, 2), Arc::new(client.clone()), shutdown)
        .with_output_path(&output);
    let summary = controller.run().await.unwrap();

    assert!(summary.cancelled);
    assert_eq!(controller.state(), RunState::Cancelled);
    assert!(summary.total_rows_written < 10_000);
    assert_eq!(summary.total_rows_written % 100, 0);
    assert!(client.calls().len() <= 6 + 2);

    let (_, rows) = read_records(&output).unwrap();
    assert_eq!(rows.len() as u64, summary.total_rows_written);
}

#[tokio::test]
async fn test_late_shutdown_does_not_cancel_finished_run() {
    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("finished.csv");
    let shutdown = ShutdownCoordinator::shared();
    // Priming plus three pages; the request lands while the last page returns
    let client = FakeClient::new(2500).shutdown_after(4, shutdown.clone());

    let mut controller = RunController::new(config(1000, 1), Arc::new(client), shutdown.clone())
        .with_output_path(&output);
    let summary = controller.run().await.unwrap();

    assert!(shutdown.is_shutdown_requested());
    assert!(!summary.cancelled);
    assert_eq!(controller.state(), RunState::Completed);
    assert_eq!(summary.total_rows_written, 2500);
}

fn slow_page_body(count: u64) -> Value {
    json!({"__blocks__": {"result": {"rows": [["Acme"]], "attr": {"count": count}}}})
}

fn request_shutdown_after(shutdown: &Arc<ShutdownCoordinator>, delay: Duration) {
    let shutdown = shutdown.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        shutdown.request_shutdown();
    });
}

#[tokio::test]
async fn test_shutdown_interrupts_slow_priming_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(slow_page_body(2500))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("priming.csv");
    let shutdown = ShutdownCoordinator::shared();
    let config = config(1000, 2).with_base_url(format!("{}/", server.uri()));
    let mut controller = RunController::from_config(config, shutdown.clone())
        .unwrap()
        .with_output_path(&output);

    request_shutdown_after(&shutdown, Duration::from_millis(200));
    let started = Instant::now();
    let summary = controller.run().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(summary.cancelled);
    assert_eq!(controller.state(), RunState::Cancelled);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_shutdown_interrupts_slow_page_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(slow_page_body(2500)))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(slow_page_body(2500))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("pages.csv");
    let shutdown = ShutdownCoordinator::shared();
    let config = config(1000, 3).with_base_url(format!("{}/", server.uri()));
    let mut controller = RunController::from_config(config, shutdown.clone())
        .unwrap()
        .with_output_path(&output);

    request_shutdown_after(&shutdown, Duration::from_millis(200));
    let started = Instant::now();
    let summary = controller.run().await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(summary.cancelled);
    assert_eq!(summary.total_rows_written, 0);
    assert_eq!(controller.state(), RunState::Cancelled);

    let (header, rows) = read_records(&output).unwrap();
    assert_eq!(header, SUPPLIER_COLUMNS);
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_http_run_against_mock_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(|request: &Request| {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            let offset = body["__blocks__"]["result"]["attr"]["offset"].as_u64().unwrap();
            let limit = body["__blocks__"]["result"]["attr"]["limit"].as_u64().unwrap();
            let end = (offset + limit).min(45);
            let rows: Vec<Value> = (offset..end)
                .map(|i| json!([format!("Supplier {i}"), null, i]))
                .collect();
            ResponseTemplate::new(200).set_body_json(json!({
                "__blocks__": {"result": {"rows": rows, "attr": {"count": 45}}}
            }))
        })
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let output = temp_dir.path().join("http.csv");
    let config = config(10, 3).with_base_url(format!("{}/", server.uri()));

    let mut controller = RunController::from_config(config, ShutdownCoordinator::shared())
        .unwrap()
        .with_output_path(&output);
    let summary = controller.run().await.unwrap();

    assert_eq!(summary.total_count, 45);
    assert_eq!(summary.total_pages_requested, 5);
    assert_eq!(summary.total_rows_written, 45);

    // Priming plus five pages
    assert_eq!(server.received_requests().await.unwrap().len(), 6);

    let (_, rows) = read_records(&output).unwrap();
    assert_eq!(rows.len(), 45);
    assert!(rows.iter().all(|r| r[1].is_empty()));
}
