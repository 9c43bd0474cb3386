//! CSV day file writer

use csv::{QuoteStyle, Writer, WriterBuilder};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::row::{quote_field, OutputRow, NO_QUERY_HEADER, QUERY_HEADER};
use super::{OutputError, OutputResult, OutputWriter, RowWriter};
use crate::QueryMode;

const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Writer for one `(day, mode)` CSV file
///
/// The file is truncated on open and the header written immediately, so a day
/// with no rows still yields a header-only file. Header and key fields are
/// always quoted and metrics never are. Records arrive pre-quoted, so the
/// underlying writer never adds quotes itself.
pub struct CsvDayWriter {
    writer: Writer<BufWriter<File>>,
    path: PathBuf,
    mode: QueryMode,
    rows_written: u64,
}

impl CsvDayWriter {
    /// Create the file at `path` and write the header for `mode`
    pub fn create<P: AsRef<Path>>(path: P, mode: QueryMode) -> OutputResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), mode = %mode, "Creating CSV writer");

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    OutputError::IoError(format!("Failed to create directory: {}", e))
                })?;
            }
        }

        let file = File::create(path).map_err(|e| {
            OutputError::IoError(format!("Failed to create {}: {}", path.display(), e))
        })?;

        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::Never)
            .from_writer(BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file));

        let header: &[&str] = match mode {
            QueryMode::Query => &QUERY_HEADER,
            QueryMode::NoQuery => &NO_QUERY_HEADER,
        };
        writer
            .write_record(header.iter().map(|name| quote_field(name)))
            .map_err(|e| OutputError::CsvError(format!("Failed to write header: {}", e)))?;

        Ok(Self {
            writer,
            path: path.to_path_buf(),
            mode,
            rows_written: 0,
        })
    }

    /// Path of the file being written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Mode of the file being written
    pub fn mode(&self) -> QueryMode {
        self.mode
    }

    /// Rows written so far (header excluded)
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

impl RowWriter for CsvDayWriter {
    fn write_row(&mut self, row: &OutputRow) -> OutputResult<()> {
        let result = match (self.mode, row) {
            (QueryMode::Query, OutputRow::Query(record)) => self.writer.serialize(record),
            (QueryMode::NoQuery, OutputRow::NoQuery(record)) => self.writer.serialize(record),
            (expected, row) => {
                return Err(OutputError::SchemaMismatch {
                    expected,
                    actual: row.mode(),
                })
            }
        };
        result.map_err(|e| OutputError::CsvError(format!("Failed to write row: {}", e)))?;

        self.rows_written += 1;
        Ok(())
    }
}

impl OutputWriter for CsvDayWriter {
    fn flush(&mut self) -> OutputResult<()> {
        self.writer
            .flush()
            .map_err(|e| OutputError::FlushError(format!("Failed to flush: {}", e)))
    }

    fn close(mut self) -> OutputResult<u64> {
        self.flush()?;

        let buf_writer = self
            .writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get inner writer: {}", e)))?;

        let file = buf_writer
            .into_inner()
            .map_err(|e| OutputError::IoError(format!("Failed to get file handle: {}", e)))?;

        file.sync_all()
            .map_err(|e| OutputError::IoError(format!("Failed to sync file: {}", e)))?;

        info!(
            path = %self.path.display(),
            rows = self.rows_written,
            "CSV file written"
        );
        Ok(self.rows_written)
    }
}
