//! Search Console REST client
//!
//! Single-attempt requests only: retrying is the pager's job, so every call
//! here maps the outcome onto a [`ClientError`] the caller can classify.

use super::auth::TokenProvider;
use super::{
    ClientError, ClientResult, QueryRequest, QueryResponse, SearchAnalyticsClient, SiteEntry,
};
use crate::metrics::ApiRequestMetrics;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Public API root
pub const DEFAULT_API_BASE_URL: &str = "https://www.googleapis.com";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest error body echoed into an error message
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Build the shared HTTP client with explicit timeouts
pub fn build_http_client(timeout: Duration) -> ClientResult<Client> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ClientError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Percent-encode a site URL as a single path segment
pub fn encode_site(site: &str) -> String {
    url::form_urlencoded::byte_serialize(site.as_bytes()).collect()
}

#[derive(Debug, Deserialize)]
struct SitesResponse {
    #[serde(default, rename = "siteEntry")]
    site_entry: Vec<SiteEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: String,
}

/// Client for the Search Console v3 REST API
pub struct SearchConsoleClient {
    http: Client,
    base_url: String,
    tokens: Box<dyn TokenProvider>,
}

impl SearchConsoleClient {
    /// Create a client rooted at `base_url`
    pub fn new(http: Client, base_url: impl Into<String>, tokens: Box<dyn TokenProvider>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// API root this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn sites_url(&self) -> String {
        format!("{}/webmasters/v3/sites", self.base_url)
    }

    fn query_url(&self, site: &str) -> String {
        format!(
            "{}/webmasters/v3/sites/{}/searchAnalytics/query",
            self.base_url,
            encode_site(site)
        )
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        request: RequestBuilder,
    ) -> ClientResult<T> {
        let token = self.tokens.access_token().await?;
        let metrics = ApiRequestMetrics::start(endpoint);

        let response = match request.bearer_auth(token.expose_secret()).send().await {
            Ok(response) => response,
            Err(e) => {
                metrics.record_network_error();
                return Err(ClientError::Network(e.to_string()));
            }
        };

        metrics.record_status(response.status().as_u16());
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ClientError::Network(format!("Failed to read response body: {}", e)))?;

    if status.is_success() {
        return serde_json::from_str(&body)
            .map_err(|e| ClientError::Parse(format!("Failed to deserialize response: {}", e)));
    }

    Err(ClientError::Http {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ => body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
    }
}

#[async_trait]
impl SearchAnalyticsClient for SearchConsoleClient {
    async fn list_sites(&self) -> ClientResult<Vec<SiteEntry>> {
        let url = self.sites_url();
        debug!(url = %url, "Listing sites");

        let response: SitesResponse = self.send("sites.list", self.http.get(&url)).await?;
        Ok(response.site_entry)
    }

    async fn query(&self, site: &str, request: &QueryRequest) -> ClientResult<QueryResponse> {
        let url = self.query_url(site);
        debug!(
            site = %site,
            day = %request.start_date,
            start_row = request.start_row,
            "Querying search analytics"
        );

        self.send("searchAnalytics.query", self.http.post(&url).json(request))
            .await
    }
}
