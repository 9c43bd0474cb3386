//! Retry log message formatting

use chrono::NaiveDate;
use search_console_dump::client::ClientError;
use search_console_dump::export::retry::{FailureKind, RetryContext};
use search_console_dump::QueryMode;
use std::time::Duration;

fn context(attempt: u32, kind: FailureKind) -> RetryContext {
    RetryContext {
        attempt,
        max_attempts: 3,
        kind,
        backoff: Duration::from_millis(2500),
        site: "https://en.wikipedia.org/".to_string(),
        day: NaiveDate::from_ymd_opt(2021, 6, 30).unwrap(),
        mode: QueryMode::NoQuery,
        start_row: 0,
        error_message: "HTTP error 429: Quota exceeded".to_string(),
    }
}

#[test]
fn format_retry_captures_attempt_and_wait() {
    let message = context(1, FailureKind::RateLimit).format_retry();
    assert!(message.contains("attempt 2/3"));
    assert!(message.contains("quota exceeded"));
    assert!(message.contains("2.5 seconds"));
    assert!(message.contains("https://en.wikipedia.org/ 2021-06-30 noquery"));
}

#[test]
fn format_success_names_site_and_day() {
    let message = context(2, FailureKind::Network).format_success();
    assert!(message.contains("Retry attempt 2/3 succeeded"));
    assert!(message.contains("2021-06-30"));
}

#[test]
fn format_failure_without_exhaustion_omits_max_retries_hint() {
    let output = context(1, FailureKind::PermissionDenied).format_failure();
    assert!(output.contains("Query failed after 1 attempts"));
    assert!(output.contains("added as a user of the property"));
    assert!(!output.contains("--max-retries"));
}

#[test]
fn failure_kind_follows_client_error() {
    assert_eq!(
        FailureKind::of(&ClientError::Http {
            status: 408,
            message: String::new()
        }),
        FailureKind::RequestTimeout
    );
    assert_eq!(
        FailureKind::of(&ClientError::Http {
            status: 404,
            message: String::new()
        }),
        FailureKind::ClientError(404)
    );
    assert_eq!(
        FailureKind::of(&ClientError::Parse("eof".to_string())),
        FailureKind::MalformedResponse
    );
    assert_eq!(FailureKind::ServerError(502).description(), "bad gateway");
}
