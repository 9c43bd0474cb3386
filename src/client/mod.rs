//! Search analytics reporting API client
//!
//! The export driver only depends on the [`SearchAnalyticsClient`] trait. The
//! concrete [`search_console::SearchConsoleClient`] talks to the Search Console
//! REST API and obtains bearer tokens from a [`auth::TokenProvider`] chosen by
//! [`create_client`].

use crate::{DataState, Dimension, QueryMode};
use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub mod auth;
pub mod search_console;

/// Maximum rows per page accepted by the API
pub const MAX_ROW_LIMIT: u32 = 25_000;

/// Client errors
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Non-success HTTP status
    #[error("HTTP error {status}: {message}")]
    Http {
        /// Status code
        status: u16,
        /// Error message extracted from the response body
        message: String,
    },

    /// Connection, timeout or other transport failure
    #[error("network error: {0}")]
    Network(String),

    /// Credentials rejected or token exchange failed
    #[error("authentication error: {0}")]
    Auth(String),

    /// Response body did not have the expected shape
    #[error("parse error: {0}")]
    Parse(String),

    /// Client could not be constructed
    #[error("configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// Whether retrying the same request may succeed.
    ///
    /// Every HTTP-level failure of a request is transient, whatever its
    /// status. Credential setup failures and malformed bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Network(_) | ClientError::Http { .. } => true,
            ClientError::Auth(_) | ClientError::Parse(_) | ClientError::Config(_) => false,
        }
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;

/// Search result type filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchType {
    /// Web search results
    #[default]
    Web,
    /// Image search results
    Image,
    /// Video search results
    Video,
    /// News tab results
    News,
    /// Discover feed
    Discover,
    /// Google News
    GoogleNews,
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "web" => Ok(SearchType::Web),
            "image" => Ok(SearchType::Image),
            "video" => Ok(SearchType::Video),
            "news" => Ok(SearchType::News),
            "discover" => Ok(SearchType::Discover),
            "googlenews" | "google_news" => Ok(SearchType::GoogleNews),
            _ => Err(format!("Invalid search type: {s}")),
        }
    }
}

/// One page request to `searchAnalytics.query`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// First day (inclusive)
    pub start_date: NaiveDate,
    /// Last day (inclusive)
    pub end_date: NaiveDate,
    /// Grouping dimensions; row keys come back in this order
    pub dimensions: Vec<Dimension>,
    /// Final or fresh data
    pub data_state: DataState,
    /// Search type filter
    #[serde(rename = "type")]
    pub search_type: SearchType,
    /// Page size
    pub row_limit: u32,
    /// Zero-based row offset
    pub start_row: u64,
}

impl QueryRequest {
    /// Request for a single day in the given mode, starting at row 0
    pub fn for_day(day: NaiveDate, mode: QueryMode) -> Self {
        Self {
            start_date: day,
            end_date: day,
            dimensions: mode.dimensions().to_vec(),
            data_state: DataState::Final,
            search_type: SearchType::Web,
            row_limit: MAX_ROW_LIMIT,
            start_row: 0,
        }
    }

    /// Override the data state
    pub fn with_data_state(mut self, data_state: DataState) -> Self {
        self.data_state = data_state;
        self
    }

    /// Override the search type
    pub fn with_search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    /// Override the page size (clamped to the API maximum)
    pub fn with_row_limit(mut self, row_limit: u32) -> Self {
        self.row_limit = row_limit.clamp(1, MAX_ROW_LIMIT);
        self
    }

    /// Set the row offset for the next page
    pub fn with_start_row(mut self, start_row: u64) -> Self {
        self.start_row = start_row;
        self
    }
}

/// One result row: dimension keys in request order plus metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiRow {
    /// Dimension values
    #[serde(default)]
    pub keys: Vec<String>,
    /// Click count
    pub clicks: f64,
    /// Impression count
    pub impressions: f64,
    /// Click-through rate (0..1)
    pub ctr: f64,
    /// Average position
    pub position: f64,
}

/// Response of `searchAnalytics.query`
///
/// A missing `rows` field is how the API signals that there are no more pages.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    /// Rows of this page
    #[serde(default)]
    pub rows: Vec<ApiRow>,
    /// How the API aggregated results
    #[serde(default)]
    pub response_aggregation_type: Option<String>,
}

/// Site visible to the authenticated account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteEntry {
    /// Property URL, e.g. `https://example.com/` or `sc-domain:example.com`
    pub site_url: String,
    /// Permission level of the account on this property
    #[serde(default)]
    pub permission_level: String,
}

/// Reporting API capability used by the export driver
#[async_trait]
pub trait SearchAnalyticsClient: Send + Sync {
    /// List the sites the authenticated account can read
    async fn list_sites(&self) -> ClientResult<Vec<SiteEntry>>;

    /// Execute one page of a search analytics query for `site`
    async fn query(&self, site: &str, request: &QueryRequest) -> ClientResult<QueryResponse>;
}

/// Credential source
#[derive(Debug, Clone)]
pub enum Credentials {
    /// Service account key JSON file
    ServiceAccountFile(PathBuf),
    /// Pre-issued OAuth access token (e.g. from `gcloud auth print-access-token`)
    AccessToken(SecretString),
}

/// Client construction settings
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Credential source
    pub credentials: Credentials,
    /// API root, without trailing slash
    pub base_url: String,
    /// Overrides the token endpoint named in the service account key
    pub token_url: Option<String>,
    /// Per-request transport timeout
    pub timeout: Duration,
}

impl ClientConfig {
    /// Settings for the public API
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            base_url: search_console::DEFAULT_API_BASE_URL.to_string(),
            token_url: None,
            timeout: search_console::DEFAULT_TIMEOUT,
        }
    }

    /// Point the client at another API root
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the OAuth token endpoint
    pub fn with_token_url(mut self, token_url: impl Into<String>) -> Self {
        self.token_url = Some(token_url.into());
        self
    }

    /// Override the transport timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Create an authenticated client for the configured credential source
pub fn create_client(config: &ClientConfig) -> ClientResult<Box<dyn SearchAnalyticsClient>> {
    let http = search_console::build_http_client(config.timeout)?;

    let tokens: Box<dyn auth::TokenProvider> = match &config.credentials {
        Credentials::ServiceAccountFile(path) => {
            let key = auth::ServiceAccountKey::from_file(path)?;
            let provider = auth::ServiceAccountTokenProvider::new(key, http.clone())?;
            match &config.token_url {
                Some(url) => Box::new(provider.with_token_url(url.clone())),
                None => Box::new(provider),
            }
        }
        Credentials::AccessToken(token) => Box::new(auth::StaticTokenProvider::new(token.clone())),
    };

    Ok(Box::new(search_console::SearchConsoleClient::new(
        http,
        config.base_url.clone(),
        tokens,
    )))
}
