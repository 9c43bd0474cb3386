//! API row to CSV record shaping

use crate::client::ApiRow;
use crate::QueryMode;
use serde::{Serialize, Serializer};

/// Header of query-mode files
pub const QUERY_HEADER: [&str; 9] = [
    "query",
    "date",
    "page",
    "country",
    "device",
    "clicks",
    "impressions",
    "ctr",
    "position",
];

/// Header of noquery-mode files
pub const NO_QUERY_HEADER: [&str; 7] = [
    "date",
    "country",
    "device",
    "clicks",
    "impressions",
    "ctr",
    "position",
];

/// Row whose key count does not match the requested dimensions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed {mode} row: expected {expected} keys, got {actual}")]
pub struct MalformedRow {
    /// Mode the row was requested in
    pub mode: QueryMode,
    /// Number of dimensions requested
    pub expected: usize,
    /// Number of keys received
    pub actual: usize,
}

/// Double every backslash
pub fn escape_backslashes(value: &str) -> String {
    value.replace('\\', "\\\\")
}

/// Wrap a field in double quotes, doubling any embedded quote
pub fn quote_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Key columns are always quoted, even when the text looks numeric
fn serialize_key<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&quote_field(value))
}

/// Integral metrics are written without a fractional part
fn serialize_metric<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

/// Output record for the query dimension set
///
/// Key fields serialize already quoted, so the record is meant for a CSV
/// writer running with `QuoteStyle::Never`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryRecord {
    /// Search query, backslashes doubled
    #[serde(serialize_with = "serialize_key")]
    pub query: String,
    /// Day
    #[serde(serialize_with = "serialize_key")]
    pub date: String,
    /// Landing page, backslashes doubled
    #[serde(serialize_with = "serialize_key")]
    pub page: String,
    /// Country code
    #[serde(serialize_with = "serialize_key")]
    pub country: String,
    /// Device category
    #[serde(serialize_with = "serialize_key")]
    pub device: String,
    /// Clicks
    #[serde(serialize_with = "serialize_metric")]
    pub clicks: f64,
    /// Impressions
    #[serde(serialize_with = "serialize_metric")]
    pub impressions: f64,
    /// Click-through rate
    #[serde(serialize_with = "serialize_metric")]
    pub ctr: f64,
    /// Average position
    #[serde(serialize_with = "serialize_metric")]
    pub position: f64,
}

/// Output record for the noquery dimension set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoQueryRecord {
    /// Day
    #[serde(serialize_with = "serialize_key")]
    pub date: String,
    /// Country code
    #[serde(serialize_with = "serialize_key")]
    pub country: String,
    /// Device category
    #[serde(serialize_with = "serialize_key")]
    pub device: String,
    /// Clicks
    #[serde(serialize_with = "serialize_metric")]
    pub clicks: f64,
    /// Impressions
    #[serde(serialize_with = "serialize_metric")]
    pub impressions: f64,
    /// Click-through rate
    #[serde(serialize_with = "serialize_metric")]
    pub ctr: f64,
    /// Average position
    #[serde(serialize_with = "serialize_metric")]
    pub position: f64,
}

/// A shaped row ready for writing
#[derive(Debug, Clone, PartialEq)]
pub enum OutputRow {
    /// Row of a query-mode request
    Query(QueryRecord),
    /// Row of a noquery-mode request
    NoQuery(NoQueryRecord),
}

impl OutputRow {
    /// Mode this row belongs to
    pub fn mode(&self) -> QueryMode {
        match self {
            OutputRow::Query(_) => QueryMode::Query,
            OutputRow::NoQuery(_) => QueryMode::NoQuery,
        }
    }
}

/// Shape an API row into the fixed record for `mode`.
///
/// Keys arrive in the order of [`QueryMode::dimensions`].
pub fn shape_row(row: &ApiRow, mode: QueryMode) -> Result<OutputRow, MalformedRow> {
    let expected = mode.dimensions().len();
    if row.keys.len() != expected {
        return Err(MalformedRow {
            mode,
            expected,
            actual: row.keys.len(),
        });
    }

    let keys = &row.keys;
    let shaped = match mode {
        QueryMode::Query => OutputRow::Query(QueryRecord {
            query: escape_backslashes(&keys[0]),
            date: keys[1].clone(),
            page: escape_backslashes(&keys[2]),
            country: keys[3].clone(),
            device: keys[4].clone(),
            clicks: row.clicks,
            impressions: row.impressions,
            ctr: row.ctr,
            position: row.position,
        }),
        QueryMode::NoQuery => OutputRow::NoQuery(NoQueryRecord {
            date: keys[0].clone(),
            country: keys[1].clone(),
            device: keys[2].clone(),
            clicks: row.clicks,
            impressions: row.impressions,
            ctr: row.ctr,
            position: row.position,
        }),
    };

    Ok(shaped)
}
