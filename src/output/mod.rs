//! Data output writers

use crate::QueryMode;

pub mod csv;
pub mod path;
pub mod row;

pub use self::csv::CsvDayWriter;
pub use path::{output_file_name, output_path};
pub use row::{escape_backslashes, shape_row, MalformedRow, OutputRow};

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

    /// Row of one mode written to a file of the other
    #[error("cannot write a {actual} row to a {expected} file")]
    SchemaMismatch {
        /// Mode of the file
        expected: QueryMode,
        /// Mode of the row
        actual: QueryMode,
    },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Generic output writer lifecycle
pub trait OutputWriter {
    /// Flush any buffered data to disk
    fn flush(&mut self) -> OutputResult<()>;

    /// Flush, sync and close; returns the number of rows written
    fn close(self) -> OutputResult<u64>;
}

/// Writer of shaped rows
pub trait RowWriter: OutputWriter {
    /// Write a single row
    fn write_row(&mut self, row: &OutputRow) -> OutputResult<()>;

    /// Write multiple rows at once
    fn write_rows(&mut self, rows: &[OutputRow]) -> OutputResult<()> {
        for row in rows {
            self.write_row(row)?;
        }
        Ok(())
    }
}
