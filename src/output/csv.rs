//! CSV output writer
//!
//! Files start with a UTF-8 byte-order mark so spreadsheet tools pick the
//! right encoding, followed by the header row. Cells go through
//! [`display_cell`](crate::display_cell), which keeps `null` and `""` apart.

use csv::{QuoteStyle, Writer, WriterBuilder};
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info};

use super::{OutputError, OutputResult, OutputWriter, RecordWriter};
use crate::{Record, TEXT_MARKER};

const DEFAULT_BUFFER_SIZE: usize = 8192; // 8KB buffer

/// UTF-8 byte-order mark
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// CSV writer for exported records
pub struct CsvRecordWriter {
    writer: Writer<BufWriter<File>>,
    columns: usize,
    records_written: u64,
}

impl CsvRecordWriter {
    /// Create the output file and write the BOM and header row
    ///
    /// Missing parent directories are created.
    ///
    /// # Arguments
    /// * `path` - Output file path, truncated if it exists
    /// * `headers` - Column names, in output order
    pub fn create<P: AsRef<Path>>(path: P, headers: &[&str]) -> OutputResult<Self> {
        Self::create_with_buffer_size(path, headers, DEFAULT_BUFFER_SIZE)
    }

    /// Create the output file with a custom write buffer size
    ///
    /// # Arguments
    /// * `path` - Output file path
    /// * `headers` - Column names, in output order
    /// * `buffer_size` - Size of write buffer in bytes
    pub fn create_with_buffer_size<P: AsRef<Path>>(
        path: P,
        headers: &[&str],
        buffer_size: usize,
    ) -> OutputResult<Self> {
        let path = path.as_ref();
        info!("Creating CSV writer: path={}", path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| OutputError::IoError(format!("Failed to create directory: {}", e)))?;
        }

        let file = File::create(path)
            .map_err(|e| OutputError::IoError(format!("Failed to create file: {}", e)))?;

        let mut buf_writer = BufWriter::with_capacity(buffer_size, file);
        buf_writer
            .write_all(UTF8_BOM)
            .map_err(|e| OutputError::IoError(format!("Failed to write BOM: {}", e)))?;

        // Rows have the schema width but records are not checked against it
        let mut writer = WriterBuilder::new()
            .flexible(true)
            .quote_style(QuoteStyle::Necessary)
            .from_writer(buf_writer);
        writer
            .write_record(headers)
            .map_err(|e| OutputError::CsvError(format!("Failed to write header: {}", e)))?;

        let mut this = Self {
            writer,
            columns: headers.len(),
            records_written: 0,
        };
        this.flush()?;
        debug!(columns = this.columns, "CSV header written");
        Ok(this)
    }

    /// Number of header columns
    pub fn columns(&self) -> usize {
        self.columns
    }
}

impl RecordWriter for CsvRecordWriter {
    fn write_record(&mut self, record: &Record) -> OutputResult<()> {
        self.writer
            .write_record(record.display_cells())
            .map_err(|e| OutputError::CsvError(format!("Failed to write record: {}", e)))?;
        self.records_written += 1;
        Ok(())
    }

    fn records_written(&self) -> u64 {
        self.records_written
    }
}

impl OutputWriter for CsvRecordWriter {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
    }

    fn close(mut self) -> OutputResult<()> {
        debug!("Closing CSV writer: {} total records written", self.records_written);

        self.flush()?;

        let buf_writer = self.writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get inner writer: {}", e))
        })?;

        let file = buf_writer.into_inner().map_err(|e| {
            OutputError::IoError(format!("Failed to get file handle: {}", e))
        })?;

        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {}", e)))?;

        info!("CSV writer closed successfully: {} records written", self.records_written);
        Ok(())
    }
}

/// Read an export file back as header plus rows of raw cell strings
///
/// The BOM is stripped. Cells keep their text marker, so `null` cells come
/// back as `""` and empty strings as `"\t"`.
pub fn read_records<P: AsRef<Path>>(path: P) -> OutputResult<(Vec<String>, Vec<Vec<String>>)> {
    let mut data = Vec::new();
    File::open(path.as_ref())
        .and_then(|mut f| f.read_to_end(&mut data))
        .map_err(|e| OutputError::IoError(format!("Failed to read file: {}", e)))?;

    let body = data.strip_prefix(UTF8_BOM).unwrap_or(&data);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(body);

    let header = reader
        .headers()
        .map_err(|e| OutputError::CsvError(format!("Failed to read header: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| OutputError::CsvError(format!("Failed to read record: {}", e)))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((header, rows))
}

/// Strip the text marker from a cell read back by [`read_records`]
pub fn strip_marker(cell: &str) -> &str {
    cell.strip_prefix(TEXT_MARKER).unwrap_or(cell)
}
