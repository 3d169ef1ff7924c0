//! Integration tests for the HTTP page client against a mock endpoint

use serde_json::json;
use supplier_export::config::ExportConfig;
use supplier_export::fetcher::{FetcherError, HttpPageClient, PageClient, PageRequest};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpPageClient {
    let config = ExportConfig::new("test-token").with_base_url(format!("{}/api/", server.uri()));
    HttpPageClient::new(&config).unwrap()
}

fn envelope(rows: serde_json::Value, count: u64) -> serde_json::Value {
    json!({
        "__sys__": {"status": 0},
        "__blocks__": {
            "result": {"rows": rows, "attr": {"count": count}}
        }
    })
}

#[tokio::test]
async fn test_fetch_posts_envelope_with_pagination() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/"))
        .and(header("access-token", "test-token"))
        .and(header("sso_token", "test-token"))
        .and(body_partial_json(json!({
            "serviceName": "PSRM01",
            "methodName": "querySupCm",
            "__blocks__": {"result": {"attr": {"limit": 1000, "offset": 2000, "showCount": "true"}}}
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(json!([["Acme", null], ["Globex", ""]]), 2500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let page = client_for(&server)
        .fetch(PageRequest { limit: 1000, offset: 2000 })
        .await
        .unwrap();

    assert_eq!(page.total_count, Some(2500));
    assert_eq!(page.rows.len(), 2);
    assert_eq!(page.rows[1].display_cells(), vec!["\tGlobex", "\t"]);
}

#[tokio::test]
async fn test_non_success_status_is_classified() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch(PageRequest { limit: 10, offset: 0 })
        .await
        .unwrap_err();

    assert_eq!(
        err,
        FetcherError::HttpStatus {
            status: 503,
            body_preview: "maintenance".to_string()
        }
    );
}

#[tokio::test]
async fn test_undecodable_body_carries_truncated_preview() {
    let server = MockServer::start().await;
    let body = format!("<html>{}</html>", "x".repeat(500));
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch(PageRequest { limit: 10, offset: 0 })
        .await
        .unwrap_err();

    match err {
        FetcherError::Decode { body_preview, .. } => {
            assert!(body_preview.starts_with("<html>"));
            assert!(body_preview.ends_with("..."));
            assert_eq!(body_preview.chars().count(), 103);
        }
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_result_block_is_empty_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"__blocks__": {}})))
        .mount(&server)
        .await;

    let page = client_for(&server)
        .fetch(PageRequest { limit: 10, offset: 0 })
        .await
        .unwrap();
    assert!(page.rows.is_empty());
    assert_eq!(page.total_count, None);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let config = ExportConfig::new("tok").with_base_url("http://127.0.0.1:1/api/");
    let err = HttpPageClient::new(&config)
        .unwrap()
        .fetch(PageRequest { limit: 10, offset: 0 })
        .await
        .unwrap_err();
    assert!(matches!(err, FetcherError::Transport(_)));
}
