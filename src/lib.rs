//! # Search Console Dump Library
//!
//! Exports per-day search analytics rows from the Search Console reporting API
//! into CSV files, resuming safely after an interruption.
//!
//! ## Features
//!
//! - **Per-day export**: one CSV file per day and query mode
//! - **Resume Capability**: a small JSON checkpoint records the next day to fetch
//! - **Pagination**: walks the `startRow` offset until the API returns no rows
//! - **Retry**: fixed-backoff retry of transient API failures per page
//! - **Pluggable auth**: service account or pre-issued access token
//!
//! ## Quick Start
//!
//! ```no_run
//! use search_console_dump::client::{create_client, ClientConfig, Credentials};
//! use search_console_dump::export::{ExportConfig, ExportDriver};
//! use chrono::NaiveDate;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_client(&ClientConfig::new(Credentials::ServiceAccountFile(
//!     "service-account.json".into(),
//! )))?;
//!
//! let config = ExportConfig::default().with_csv_prefix("daily-searchconsole");
//! let driver = ExportDriver::new(client.as_ref(), config);
//!
//! let start = NaiveDate::from_ymd_opt(2021, 1, 1).unwrap();
//! let end = NaiveDate::from_ymd_opt(2021, 1, 31).unwrap();
//! let sites = vec!["https://en.wikipedia.org/".to_string()];
//! driver.run(start, end, &sites).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`client`] - Reporting API client trait, reqwest implementation and auth
//! - [`export`] - Export driver, pager and retry policy
//! - [`output`] - Row shaping and CSV writers
//! - [`resume`] - Checkpoint persistence
//! - [`cli`] - Command line front-end
//! - [`metrics`] - Prometheus metrics

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// CLI command implementations
pub mod cli;

/// Reporting API client
pub mod client;

/// Export orchestration
pub mod export;

/// Observability metrics
pub mod metrics;

/// CSV output
pub mod output;

/// Checkpoint persistence for resumable exports
pub mod resume;

pub use export::{ExportConfig, ExportDriver, ExportError};
pub use resume::{Checkpoint, CheckpointStore, ResumePolicy};

/// Grouping key requested from the search analytics API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Dimension {
    /// Search query text
    Query,
    /// Calendar day
    Date,
    /// Landing page URL
    Page,
    /// ISO 3166-1 alpha-3 country code
    Country,
    /// Device category (DESKTOP, MOBILE, TABLET)
    Device,
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Dimension::Query => "QUERY",
            Dimension::Date => "DATE",
            Dimension::Page => "PAGE",
            Dimension::Country => "COUNTRY",
            Dimension::Device => "DEVICE",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "QUERY" => Ok(Dimension::Query),
            "DATE" => Ok(Dimension::Date),
            "PAGE" => Ok(Dimension::Page),
            "COUNTRY" => Ok(Dimension::Country),
            "DEVICE" => Ok(Dimension::Device),
            _ => Err(format!("Invalid dimension: {s}")),
        }
    }
}

/// Which set of dimensions a request groups by, and therefore which CSV schema
/// its rows are written with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryMode {
    /// QUERY, DATE, PAGE, COUNTRY, DEVICE
    Query,
    /// DATE, COUNTRY, DEVICE
    NoQuery,
}

const DIMENSIONS_WITH_QUERY: &[Dimension] = &[
    Dimension::Query,
    Dimension::Date,
    Dimension::Page,
    Dimension::Country,
    Dimension::Device,
];

const DIMENSIONS_WITHOUT_QUERY: &[Dimension] =
    &[Dimension::Date, Dimension::Country, Dimension::Device];

impl QueryMode {
    /// Dimensions requested for this mode, in the order the API returns keys
    pub fn dimensions(&self) -> &'static [Dimension] {
        match self {
            QueryMode::Query => DIMENSIONS_WITH_QUERY,
            QueryMode::NoQuery => DIMENSIONS_WITHOUT_QUERY,
        }
    }

    /// Label used in output file names and log lines
    pub fn label(&self) -> &'static str {
        match self {
            QueryMode::Query => "query",
            QueryMode::NoQuery => "noquery",
        }
    }
}

impl std::fmt::Display for QueryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether to request only settled data or include provisional ("fresh") data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataState {
    /// Settled data only
    #[default]
    Final,
    /// Settled and fresh data
    All,
}

impl FromStr for DataState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "final" => Ok(DataState::Final),
            "all" | "fresh" => Ok(DataState::All),
            _ => Err(format!("Invalid data state: {s}. Valid options: final, all")),
        }
    }
}
