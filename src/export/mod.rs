//! Export orchestration: per-day loop, pagination and retries

use crate::client::ClientError;
use crate::output::{MalformedRow, OutputError};
use crate::resume::ResumeError;
use chrono::NaiveDate;

pub mod config;
pub mod driver;
pub mod pager;
pub mod retry;

pub use config::{ExportConfig, QueryModeSelection, RetryPolicy};
pub use driver::{ExportDriver, ExportSummary};
pub use pager::Pager;

/// Export errors
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// End date precedes start date
    #[error("invalid date range: end date {end} is before start date {start}")]
    InvalidDateRange {
        /// Requested start
        start: NaiveDate,
        /// Requested end
        end: NaiveDate,
    },

    /// No sites to export
    #[error("no sites given")]
    NoSites,

    /// Requested sites the account cannot read
    #[error("sites not available to this account: {}", missing.join(", "))]
    SitesUnavailable {
        /// Sites absent from the account's site list
        missing: Vec<String>,
    },

    /// Transient failures outlasted the retry budget
    #[error("{site} {day}: giving up after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Site being exported
        site: String,
        /// Day being exported
        day: NaiveDate,
        /// Attempts made
        attempts: u32,
        /// Last failure
        #[source]
        source: ClientError,
    },

    /// API never returned an empty page
    #[error("{site} {day}: page limit of {limit} exceeded")]
    PageLimitExceeded {
        /// Site being exported
        site: String,
        /// Day being exported
        day: NaiveDate,
        /// Configured cap
        limit: usize,
    },

    /// Row keys do not match the requested dimensions
    #[error(transparent)]
    MalformedRow(#[from] MalformedRow),

    /// Client failure that is not retried (credentials, malformed body)
    #[error("API error: {0}")]
    Client(#[from] ClientError),

    /// Checkpoint persistence failure
    #[error("checkpoint error: {0}")]
    Resume(#[from] ResumeError),

    /// CSV write failure
    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

/// Result type for export operations
pub type ExportResult<T> = Result<T, ExportError>;
