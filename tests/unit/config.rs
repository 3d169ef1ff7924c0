//! Unit tests for configuration loading and validation

use std::io::Write;
use std::time::Duration;
use supplier_export::config::{ConfigError, ExportConfig, DEFAULT_BASE_URL, MAX_WORKERS_LIMIT};
use tempfile::{NamedTempFile, TempDir};

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_full_config() {
    let file = write_config(
        r#"{
            "access_token": "tok-abc",
            "page_size": 250,
            "request_delay": 1.5,
            "output_file_prefix": "vendors",
            "max_workers": 8,
            "base_url": "http://localhost:8080/api/",
            "request_timeout_secs": 12,
            "metrics_addr": "127.0.0.1:9100"
        }"#,
    );

    let config = ExportConfig::load(file.path()).unwrap();
    assert_eq!(config.access_token, "tok-abc");
    assert_eq!(config.page_size.get(), 250);
    assert_eq!(config.request_delay, Duration::from_millis(1500));
    assert_eq!(config.output_file_prefix, "vendors");
    assert_eq!(config.max_workers, 8);
    assert_eq!(config.base_url, "http://localhost:8080/api/");
    assert_eq!(config.request_timeout, Duration::from_secs(12));
    assert_eq!(config.metrics_addr, Some("127.0.0.1:9100".parse().unwrap()));
    assert!(config.validate().is_ok());
}

#[test]
fn test_absent_fields_take_defaults() {
    let file = write_config(r#"{"access_token": "tok"}"#);
    let config = ExportConfig::load(file.path()).unwrap();

    assert_eq!(config.page_size.get(), 1000);
    assert_eq!(config.max_workers, 5);
    assert_eq!(config.output_file_prefix, "supplier_data");
    assert_eq!(config.base_url, DEFAULT_BASE_URL);
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = ExportConfig::load(dir.path().join("nope.json")).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
    assert!(err.to_string().contains("nope.json"));
}

#[test]
fn test_malformed_json() {
    let file = write_config("{ access_token: ");
    let err = ExportConfig::load(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Malformed(_)));
}

#[test]
fn test_empty_token_loads_but_fails_validation() {
    let file = write_config(r#"{"access_token": ""}"#);
    let config = ExportConfig::load(file.path()).unwrap();
    assert!(matches!(config.validate(), Err(ConfigError::MissingAccessToken)));
}

#[test]
fn test_worker_limit_enforced() {
    let json = format!(
        r#"{{"access_token": "tok", "max_workers": {}}}"#,
        MAX_WORKERS_LIMIT + 1
    );
    let err = ExportConfig::from_json(&json).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { key: "max_workers", .. }));

    let config = ExportConfig::new("tok").with_max_workers(0);
    assert!(config.validate().is_err());
}

#[test]
fn test_negative_delay_rejected() {
    let err = ExportConfig::from_json(r#"{"access_token": "tok", "request_delay": -1}"#)
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { key: "request_delay", .. }));
}

#[test]
fn test_oversized_delay_rejected() {
    let err = ExportConfig::from_json(r#"{"access_token": "tok", "request_delay": 1e300}"#)
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { key: "request_delay", .. }));
}
