//! End-to-end export against the scripted client

use crate::support::{date, page_for, ScriptedClient};
use search_console_dump::client::{ApiRow, QueryResponse};
use search_console_dump::export::{ExportConfig, ExportDriver, QueryModeSelection, RetryPolicy};
use search_console_dump::ExportError;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

const SITE: &str = "https://example.com/";

fn config(dir: &TempDir) -> ExportConfig {
    ExportConfig::default()
        .with_csv_prefix(dir.path().join("out").to_string_lossy().to_string())
        .with_checkpoint_file(dir.path().join("checkpoint.json"))
        .with_retry(RetryPolicy::new(0, Duration::ZERO))
}

fn read_lines(path: &std::path::Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_two_days_one_site_writes_all_files_and_clears_checkpoint() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::paged(&[SITE], 2);
    let driver = ExportDriver::new(&client, config(&dir));

    let summary = driver
        .run(date(2021, 1, 1), date(2021, 1, 2), &[SITE.to_string()])
        .await
        .unwrap();

    assert_eq!(summary.days, 2);
    assert_eq!(summary.rows, 8);
    assert_eq!(summary.files.len(), 4);

    for day in ["2021-01-01", "2021-01-02"] {
        let query = read_lines(&dir.path().join(format!("out-query-{day}.csv")));
        assert_eq!(query.len(), 3);
        assert_eq!(
            query[0],
            "\"query\",\"date\",\"page\",\"country\",\"device\",\"clicks\",\"impressions\",\"ctr\",\"position\""
        );
        assert_eq!(
            query[1],
            format!("\"query 0\",\"{day}\",\"https://example.com/page/0\",\"usa\",\"DESKTOP\",0,10,0.1,2.5")
        );

        let noquery = read_lines(&dir.path().join(format!("out-noquery-{day}.csv")));
        assert_eq!(noquery.len(), 3);
        assert_eq!(
            noquery[2],
            format!("\"{day}\",\"usa\",\"DESKTOP\",1,10,0.1,2.5")
        );
    }

    assert!(!dir.path().join("checkpoint.json").exists());
}

#[tokio::test]
async fn test_day_without_rows_writes_header_only_files() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::paged(&[SITE], 0);
    let driver = ExportDriver::new(&client, config(&dir));

    let summary = driver
        .run(date(2021, 1, 1), date(2021, 1, 1), &[SITE.to_string()])
        .await
        .unwrap();

    assert_eq!(summary.rows, 0);
    let lines = read_lines(&dir.path().join("out-noquery-2021-01-01.csv"));
    assert_eq!(lines.len(), 1);
}

#[tokio::test]
async fn test_sites_are_written_in_order_and_deduplicated() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::new(&["https://a/", "https://b/"], |site, request| {
        if request.start_row > 0 {
            return Ok(QueryResponse::default());
        }
        let mut page = page_for(request, 1);
        // Tag the row with its site so file order is observable
        page.rows[0].keys[1] = site.to_string();
        Ok(page)
    });
    let driver = ExportDriver::new(
        &client,
        config(&dir).with_query_modes(QueryModeSelection::NoQueryOnly),
    );

    let sites = vec![
        "https://b/".to_string(),
        "https://a/".to_string(),
        "https://b/".to_string(),
    ];
    let summary = driver
        .run(date(2021, 1, 1), date(2021, 1, 1), &sites)
        .await
        .unwrap();

    assert_eq!(summary.rows, 2);
    assert_eq!(summary.files.len(), 1);
    assert!(!dir.path().join("out-query-2021-01-01.csv").exists());

    let lines = read_lines(&dir.path().join("out-noquery-2021-01-01.csv"));
    assert_eq!(lines.len(), 3);
    assert!(lines[1].contains("https://b/"));
    assert!(lines[2].contains("https://a/"));
}

#[tokio::test]
async fn test_query_only_mode_requests_query_dimensions() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::paged(&[SITE], 1);
    let driver = ExportDriver::new(
        &client,
        config(&dir).with_query_modes(QueryModeSelection::QueryOnly),
    );

    driver
        .run(date(2021, 1, 1), date(2021, 1, 1), &[SITE.to_string()])
        .await
        .unwrap();

    assert!(dir.path().join("out-query-2021-01-01.csv").exists());
    assert!(!dir.path().join("out-noquery-2021-01-01.csv").exists());
    assert!(client
        .calls()
        .iter()
        .all(|c| c.mode == search_console_dump::QueryMode::Query));
}

#[tokio::test]
async fn test_malformed_row_is_fatal_and_keeps_checkpoint() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::new(&[SITE], |_site, request| {
        if request.start_row > 0 {
            return Ok(QueryResponse::default());
        }
        Ok(QueryResponse {
            rows: vec![ApiRow {
                keys: vec!["only-one-key".to_string()],
                clicks: 1.0,
                impressions: 1.0,
                ctr: 1.0,
                position: 1.0,
            }],
            response_aggregation_type: None,
        })
    });
    let driver = ExportDriver::new(&client, config(&dir));

    let err = driver
        .run(date(2021, 1, 1), date(2021, 1, 3), &[SITE.to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::MalformedRow(_)));
    assert!(dir.path().join("checkpoint.json").exists());
}

#[tokio::test]
async fn test_backslashes_are_doubled_in_query_and_page_columns() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::new(&[SITE], |_site, request| {
        if request.start_row > 0 {
            return Ok(QueryResponse::default());
        }
        let mut page = page_for(request, 1);
        if request.dimensions.len() == 5 {
            page.rows[0].keys[0] = r"a\b".to_string();
            page.rows[0].keys[2] = r"https://x/\p".to_string();
            page.rows[0].keys[3] = r"u\s".to_string();
        }
        Ok(page)
    });
    let driver = ExportDriver::new(
        &client,
        config(&dir).with_query_modes(QueryModeSelection::QueryOnly),
    );

    driver
        .run(date(2021, 1, 1), date(2021, 1, 1), &[SITE.to_string()])
        .await
        .unwrap();

    let lines = read_lines(&dir.path().join("out-query-2021-01-01.csv"));
    assert_eq!(
        lines[1],
        r#""a\\b","2021-01-01","https://x/\\p","u\s","DESKTOP",0,10,0.1,2.5"#
    );
}
