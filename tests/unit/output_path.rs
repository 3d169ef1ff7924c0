//! Unit tests for output file naming

use chrono::{Local, TimeZone};
use std::path::{Path, PathBuf};
use supplier_export::output::{default_output_path, resolve_output_path};

#[test]
fn test_timestamped_name() {
    let ts = Local.with_ymd_and_hms(2025, 12, 31, 23, 59, 58).unwrap();
    assert_eq!(
        default_output_path("supplier_data", &ts),
        PathBuf::from("supplier_data_20251231_235958.csv")
    );
}

#[test]
fn test_override_is_used_verbatim() {
    let path = resolve_output_path(Some(Path::new("exports/today.csv")), "supplier_data");
    assert_eq!(path, PathBuf::from("exports/today.csv"));
}

#[test]
fn test_generated_name_is_relative_to_working_directory() {
    let path = resolve_output_path(None, "supplier_data");
    assert!(path.is_relative());
    assert_eq!(path.parent(), Some(Path::new("")));
}
