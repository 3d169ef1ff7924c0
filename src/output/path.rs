//! Output file naming
//!
//! Generated names take the form `{prefix}_{YYYYMMDD_HHMMSS}.csv`, stamped
//! with local time at the moment the run starts writing.

use chrono::{DateTime, Local, TimeZone};
use std::path::{Path, PathBuf};

/// Timestamp layout of generated filenames
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Build the default output filename for `prefix` at `timestamp`
pub fn default_output_path<Tz>(prefix: &str, timestamp: &DateTime<Tz>) -> PathBuf
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    PathBuf::from(format!("{}_{}.csv", prefix, timestamp.format(TIMESTAMP_FORMAT)))
}

/// Pick the output path of a run
///
/// An explicit path wins; otherwise a timestamped name is generated from
/// `prefix` using the current local time.
pub fn resolve_output_path(explicit: Option<&Path>, prefix: &str) -> PathBuf {
    match explicit {
        Some(path) => path.to_path_buf(),
        None => default_output_path(prefix, &Local::now()),
    }
}
