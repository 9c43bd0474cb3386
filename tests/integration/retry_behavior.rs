//! Retry budget and backoff timing for page requests

use crate::support::{date, noquery_page, server_error, ScriptedClient};
use search_console_dump::client::{ClientError, QueryRequest};
use search_console_dump::export::retry::query_with_retries;
use search_console_dump::export::RetryPolicy;
use search_console_dump::{ExportError, QueryMode};
use std::time::Duration;
use tokio::time::Instant;

const SITE: &str = "https://example.com/";

fn request() -> QueryRequest {
    QueryRequest::for_day(date(2021, 1, 1), QueryMode::NoQuery)
}

fn policy() -> RetryPolicy {
    RetryPolicy::new(2, Duration::from_secs(5))
}

#[tokio::test(start_paused = true)]
async fn test_always_failing_page_makes_three_attempts() {
    let client = ScriptedClient::new(&[SITE], |_site, _request| Err(server_error()));
    let started = Instant::now();

    let err = query_with_retries(&client, SITE, QueryMode::NoQuery, &request(), policy())
        .await
        .unwrap_err();

    assert_eq!(client.calls().len(), 3);
    match err {
        ExportError::RetriesExhausted {
            site,
            day,
            attempts,
            source,
        } => {
            assert_eq!(site, SITE);
            assert_eq!(day, date(2021, 1, 1));
            assert_eq!(attempts, 3);
            assert!(source.is_transient());
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
    // Two sleeps, none after the last attempt
    assert_eq!(started.elapsed(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_success_on_second_attempt_sleeps_once() {
    let client = ScriptedClient::scripted(&[SITE], vec![Err(server_error()), Ok(noquery_page(4))]);
    let started = Instant::now();

    let response = query_with_retries(&client, SITE, QueryMode::NoQuery, &request(), policy())
        .await
        .unwrap();

    assert_eq!(response.rows.len(), 4);
    assert_eq!(client.calls().len(), 2);
    assert_eq!(started.elapsed(), Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_and_network_errors_are_retried() {
    let client = ScriptedClient::scripted(
        &[SITE],
        vec![
            Err(ClientError::Http {
                status: 429,
                message: "quota".to_string(),
            }),
            Err(ClientError::Network("connection reset".to_string())),
            Ok(noquery_page(1)),
        ],
    );

    let response = query_with_retries(&client, SITE, QueryMode::NoQuery, &request(), policy())
        .await
        .unwrap();

    assert_eq!(response.rows.len(), 1);
    assert_eq!(client.calls().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_persistent_client_error_uses_full_retry_budget() {
    for status in [400, 401, 403, 404] {
        let client = ScriptedClient::new(&[SITE], move |_site, _request| {
            Err(ClientError::Http {
                status,
                message: "backend said no".to_string(),
            })
        });
        let started = Instant::now();

        let err = query_with_retries(&client, SITE, QueryMode::NoQuery, &request(), policy())
            .await
            .unwrap_err();

        match err {
            ExportError::RetriesExhausted {
                attempts, source, ..
            } => {
                assert_eq!(attempts, 3, "status {status}");
                assert!(matches!(source, ClientError::Http { status: s, .. } if s == status));
            }
            other => panic!("expected RetriesExhausted for {status}, got {other:?}"),
        }
        assert_eq!(client.calls().len(), 3, "status {status}");
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }
}

#[tokio::test(start_paused = true)]
async fn test_malformed_body_is_not_retried() {
    let client = ScriptedClient::new(&[SITE], |_site, _request| {
        Err(ClientError::Parse("expected value at line 1".to_string()))
    });
    let started = Instant::now();

    let err = query_with_retries(&client, SITE, QueryMode::NoQuery, &request(), policy())
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::Client(ClientError::Parse(_))));
    assert_eq!(client.calls().len(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_auth_failure_is_not_retried() {
    let client = ScriptedClient::new(&[SITE], |_site, _request| {
        Err(ClientError::Auth("token expired".to_string()))
    });

    let err = query_with_retries(&client, SITE, QueryMode::NoQuery, &request(), policy())
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::Client(ClientError::Auth(_))));
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_zero_retries_fails_after_single_attempt() {
    let client = ScriptedClient::new(&[SITE], |_site, _request| Err(server_error()));

    let err = query_with_retries(
        &client,
        SITE,
        QueryMode::NoQuery,
        &request(),
        RetryPolicy::new(0, Duration::from_secs(5)),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ExportError::RetriesExhausted { attempts: 1, .. }));
    assert_eq!(client.calls().len(), 1);
}
