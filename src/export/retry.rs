//! Page request retries and retry log formatting
//!
//! Only transient client errors are retried. Between attempts the caller
//! sleeps for the policy's fixed backoff; there is no sleep after the last
//! failed attempt.

use super::config::RetryPolicy;
use super::{ExportError, ExportResult};
use crate::client::{ClientError, QueryRequest, QueryResponse, SearchAnalyticsClient};
use crate::metrics;
use crate::QueryMode;
use chrono::NaiveDate;
use std::time::Duration;
use tracing::{error, info, warn};

/// Classification of a failed request for user messaging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Connection refused, DNS failure, timeout
    Network,
    /// HTTP 429
    RateLimit,
    /// HTTP 408
    RequestTimeout,
    /// HTTP 5xx
    ServerError(u16),
    /// Credentials rejected
    AuthFailed,
    /// HTTP 403
    PermissionDenied,
    /// Other HTTP 4xx
    ClientError(u16),
    /// Unexpected response body
    MalformedResponse,
}

impl FailureKind {
    /// Classify a client error
    pub fn of(err: &ClientError) -> Self {
        match err {
            ClientError::Network(_) => FailureKind::Network,
            ClientError::Http { status: 429, .. } => FailureKind::RateLimit,
            ClientError::Http { status: 408, .. } => FailureKind::RequestTimeout,
            ClientError::Http { status: 401, .. } => FailureKind::AuthFailed,
            ClientError::Http { status: 403, .. } => FailureKind::PermissionDenied,
            ClientError::Http { status, .. } if *status >= 500 => FailureKind::ServerError(*status),
            ClientError::Http { status, .. } => FailureKind::ClientError(*status),
            ClientError::Auth(_) | ClientError::Config(_) => FailureKind::AuthFailed,
            ClientError::Parse(_) => FailureKind::MalformedResponse,
        }
    }

    /// Short description used inside retry log messages
    pub fn description(&self) -> &'static str {
        match self {
            Self::Network => "network error",
            Self::RateLimit => "quota exceeded",
            Self::RequestTimeout => "request timeout",
            Self::ServerError(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "server error",
            },
            Self::AuthFailed => "authentication failed",
            Self::PermissionDenied => "permission denied",
            Self::ClientError(_) => "client error",
            Self::MalformedResponse => "malformed response",
        }
    }

    /// Suggested remediation shown with a final failure
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::Network | Self::RequestTimeout => {
                "Check your network connection and firewall settings"
            }
            Self::RateLimit => "Search Console query quota was exceeded; wait and resume later",
            Self::ServerError(_) => "The API may be experiencing issues; try again later",
            Self::AuthFailed => "Verify the service account key or access token",
            Self::PermissionDenied => {
                "Make sure the account has been added as a user of the property"
            }
            Self::ClientError(_) => "Review the site URL and date range arguments",
            Self::MalformedResponse => "The API returned an unexpected body; try again later",
        }
    }
}

/// Context for formatting retry messages
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Attempt that just failed (1-based)
    pub attempt: u32,
    /// Maximum number of attempts configured
    pub max_attempts: u32,
    /// Classification of the failure
    pub kind: FailureKind,
    /// Wait before the next attempt
    pub backoff: Duration,
    /// Site being exported
    pub site: String,
    /// Day being exported
    pub day: NaiveDate,
    /// Mode being exported
    pub mode: QueryMode,
    /// Row offset of the failing page
    pub start_row: u64,
    /// Error message of the failure
    pub error_message: String,
}

impl RetryContext {
    /// Format the message logged before sleeping
    pub fn format_retry(&self) -> String {
        format!(
            "Retrying (attempt {}/{}) after {} - waiting {:.1} seconds... ({} {} {}, row {})",
            self.attempt + 1,
            self.max_attempts,
            self.kind.description(),
            self.backoff.as_secs_f64(),
            self.site,
            self.day,
            self.mode,
            self.start_row
        )
    }

    /// Format the message logged when a retried request eventually succeeds
    pub fn format_success(&self) -> String {
        format!(
            "Retry attempt {}/{} succeeded - resuming export ({} {})",
            self.attempt, self.max_attempts, self.site, self.day
        )
    }

    /// Format the final failure summary with suggestions
    pub fn format_failure(&self) -> String {
        let mut lines = vec![
            format!("[FAILED] Query failed after {} attempts", self.attempt),
            format!("  Last error: {}", self.error_message),
            format!("  Site: {}", self.site),
            format!("  Day: {} ({})", self.day, self.mode),
            format!("  Start row: {}", self.start_row),
            "  Suggestions:".to_string(),
        ];

        for suggestion in self.format_suggestions() {
            lines.push(format!("    - {suggestion}"));
        }

        lines.join("\n")
    }

    /// Suggestions tailored to the failure
    pub fn format_suggestions(&self) -> Vec<String> {
        let mut suggestions = vec![self.kind.suggestion().to_string()];
        if self.attempt >= self.max_attempts {
            suggestions.push(format!(
                "Try increasing --max-retries (current: {})",
                self.max_attempts.saturating_sub(1)
            ));
        }
        suggestions.push("Re-run the same command to resume from the checkpoint".to_string());
        suggestions
    }
}

/// Execute one page request, retrying transient failures per `policy`
pub async fn query_with_retries(
    client: &dyn SearchAnalyticsClient,
    site: &str,
    mode: QueryMode,
    request: &QueryRequest,
    policy: RetryPolicy,
) -> ExportResult<QueryResponse> {
    let max_attempts = policy.max_attempts();
    let mut attempt = 1;

    loop {
        let err = match client.query(site, request).await {
            Ok(response) => {
                if attempt > 1 {
                    let context = context(attempt, max_attempts, policy, site, mode, request, None);
                    info!("{}", context.format_success());
                }
                return Ok(response);
            }
            Err(err) => err,
        };

        let context = context(attempt, max_attempts, policy, site, mode, request, Some(&err));

        if !err.is_transient() {
            error!("{}", context.format_failure());
            return Err(ExportError::Client(err));
        }

        if attempt >= max_attempts {
            error!("{}", context.format_failure());
            return Err(ExportError::RetriesExhausted {
                site: site.to_string(),
                day: request.start_date,
                attempts: attempt,
                source: err,
            });
        }

        warn!(
            site = %site,
            day = %request.start_date,
            error = %err,
            "{}",
            context.format_retry()
        );
        metrics::record_retry_backoff(policy.backoff(), attempt);
        tokio::time::sleep(policy.backoff()).await;
        attempt += 1;
    }
}

fn context(
    attempt: u32,
    max_attempts: u32,
    policy: RetryPolicy,
    site: &str,
    mode: QueryMode,
    request: &QueryRequest,
    err: Option<&ClientError>,
) -> RetryContext {
    RetryContext {
        attempt,
        max_attempts,
        kind: err.map(FailureKind::of).unwrap_or(FailureKind::Network),
        backoff: policy.backoff(),
        site: site.to_string(),
        day: request.start_date,
        mode,
        start_row: request.start_row,
        error_message: err.map(ToString::to_string).unwrap_or_default(),
    }
}
