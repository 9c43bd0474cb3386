//! Export configuration and defaults

use super::{ExportError, ExportResult};
use crate::client::{SearchType, MAX_ROW_LIMIT};
use crate::resume::ResumePolicy;
use crate::{DataState, QueryMode};
use chrono::{Duration as ChronoDuration, NaiveDate};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Default output file prefix
pub const DEFAULT_CSV_PREFIX: &str = "daily-searchconsole";

/// Default checkpoint location
pub const DEFAULT_CHECKPOINT_FILE: &str = "checkpoint.json";

/// Default first and last day
pub const DEFAULT_DATE: &str = "2021-01-01";

/// Sites exported when none are given, comma-separated
pub const DEFAULT_SITES: &str = "https://en.wikipedia.org/,https://en.m.wikipedia.org/";

/// Additional attempts after a failed page request
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Fixed wait between attempts
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Final data lags this many days behind today
pub const FINAL_DATA_DELAY_DAYS: i64 = 5;

/// The API keeps roughly 16 months of history
pub const DATA_RETENTION_DAYS: i64 = 16 * 30;

/// Upper bound on pages fetched for one (site, day, mode)
pub const MAX_PAGES_PER_QUERY: usize = 100_000;

/// Fixed-backoff retry policy for page requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff: Duration,
}

impl RetryPolicy {
    /// Policy allowing `max_retries` additional attempts spaced by `backoff`
    pub fn new(max_retries: u32, backoff: Duration) -> Self {
        Self {
            max_retries,
            backoff,
        }
    }

    /// Additional attempts after the first
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Total attempts including the first
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait between attempts
    pub fn backoff(&self) -> Duration {
        self.backoff
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_BACKOFF)
    }
}

/// Which query modes are written per day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryModeSelection {
    /// Both files per day
    #[default]
    Both,
    /// Only the query-dimension file
    QueryOnly,
    /// Only the noquery-dimension file
    NoQueryOnly,
}

impl QueryModeSelection {
    /// Modes in write order
    pub fn modes(&self) -> &'static [QueryMode] {
        match self {
            QueryModeSelection::Both => &[QueryMode::Query, QueryMode::NoQuery],
            QueryModeSelection::QueryOnly => &[QueryMode::Query],
            QueryModeSelection::NoQueryOnly => &[QueryMode::NoQuery],
        }
    }
}

impl FromStr for QueryModeSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "both" => Ok(QueryModeSelection::Both),
            "query" => Ok(QueryModeSelection::QueryOnly),
            "noquery" | "no-query" => Ok(QueryModeSelection::NoQueryOnly),
            _ => Err(format!(
                "Invalid query mode: {s}. Valid options: both, query, noquery"
            )),
        }
    }
}

/// Immutable settings for one export run
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Output file prefix, may include directories
    pub csv_prefix: String,
    /// Checkpoint file location
    pub checkpoint_file: PathBuf,
    /// Checkpoint handling at startup
    pub resume_policy: ResumePolicy,
    /// Modes written per day
    pub query_modes: QueryModeSelection,
    /// Final or fresh data
    pub data_state: DataState,
    /// Search type filter
    pub search_type: SearchType,
    /// Rows requested per page
    pub row_limit: u32,
    /// Page retry policy
    pub retry: RetryPolicy,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv_prefix: DEFAULT_CSV_PREFIX.to_string(),
            checkpoint_file: PathBuf::from(DEFAULT_CHECKPOINT_FILE),
            resume_policy: ResumePolicy::default(),
            query_modes: QueryModeSelection::default(),
            data_state: DataState::default(),
            search_type: SearchType::default(),
            row_limit: MAX_ROW_LIMIT,
            retry: RetryPolicy::default(),
        }
    }
}

impl ExportConfig {
    /// Set the output file prefix
    pub fn with_csv_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.csv_prefix = prefix.into();
        self
    }

    /// Set the checkpoint file location
    pub fn with_checkpoint_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.checkpoint_file = path.into();
        self
    }

    /// Set the checkpoint policy
    pub fn with_resume_policy(mut self, policy: ResumePolicy) -> Self {
        self.resume_policy = policy;
        self
    }

    /// Set which modes are written
    pub fn with_query_modes(mut self, modes: QueryModeSelection) -> Self {
        self.query_modes = modes;
        self
    }

    /// Set the data state
    pub fn with_data_state(mut self, data_state: DataState) -> Self {
        self.data_state = data_state;
        self
    }

    /// Set the search type
    pub fn with_search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    /// Set the page size (clamped to the API maximum)
    pub fn with_row_limit(mut self, row_limit: u32) -> Self {
        self.row_limit = row_limit.clamp(1, MAX_ROW_LIMIT);
        self
    }

    /// Set the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(input: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{input}': {e} (expected YYYY-MM-DD)"))
}

/// Reject ranges whose end precedes their start
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> ExportResult<()> {
    if end < start {
        return Err(ExportError::InvalidDateRange { start, end });
    }
    Ok(())
}

/// Non-fatal warnings about a range relative to `today`
pub fn date_range_warnings(start: NaiveDate, end: NaiveDate, today: NaiveDate) -> Vec<String> {
    let mut warnings = Vec::new();

    if end > today - ChronoDuration::days(FINAL_DATA_DELAY_DAYS) {
        warnings.push(format!(
            "End date {end} is within {FINAL_DATA_DELAY_DAYS} days of today; final data may be incomplete"
        ));
    }

    if start < today - ChronoDuration::days(DATA_RETENTION_DAYS) {
        warnings.push(format!(
            "Start date {start} is more than 16 months ago; the API may return no data for early days"
        ));
    }

    warnings
}

/// Remove duplicate sites, keeping first occurrences in order
pub fn dedup_sites(sites: &[String]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    sites
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_string()))
        .map(str::to_string)
        .collect()
}
