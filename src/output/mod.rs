//! Data output writers

use crate::Record;

pub mod csv;
pub mod path;

pub use self::csv::{read_records, CsvRecordWriter};
pub use path::{default_output_path, resolve_output_path};

/// Output writer errors
#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// CSV write error
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Buffer flush error
    #[error("flush error: {0}")]
    FlushError(String),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Generic output writer trait
pub trait OutputWriter {
    /// Flush any buffered data to disk
    fn flush(&mut self) -> OutputResult<()>;

    /// Close the writer and finalize output
    fn close(self) -> OutputResult<()>;
}

/// Trait for writing exported records
pub trait RecordWriter: OutputWriter {
    /// Write a single record to output
    fn write_record(&mut self, record: &Record) -> OutputResult<()>;

    /// Write multiple records at once
    fn write_records(&mut self, records: &[Record]) -> OutputResult<()> {
        for record in records {
            self.write_record(record)?;
        }
        Ok(())
    }

    /// Records written so far
    fn records_written(&self) -> u64;
}
