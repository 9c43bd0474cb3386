//! Output file naming
//!
//! Files are named `<prefix>-<mode>-<YYYY-MM-DD>.csv`. The prefix may contain
//! directories, which are created when the file is opened.

use crate::QueryMode;
use chrono::NaiveDate;
use std::path::PathBuf;

/// File name for one day and mode
pub fn output_file_name(prefix: &str, mode: QueryMode, day: NaiveDate) -> String {
    format!("{}-{}-{}.csv", prefix, mode.label(), day.format("%Y-%m-%d"))
}

/// Path of the CSV file for one day and mode
pub fn output_path(prefix: &str, mode: QueryMode, day: NaiveDate) -> PathBuf {
    PathBuf::from(output_file_name(prefix, mode, day))
}
