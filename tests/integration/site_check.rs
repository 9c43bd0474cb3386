//! Site authorization and argument checks that run before any export work

use crate::support::{date, ScriptedClient};
use search_console_dump::export::{ExportConfig, ExportDriver};
use search_console_dump::ExportError;
use tempfile::TempDir;

fn config(dir: &TempDir) -> ExportConfig {
    ExportConfig::default()
        .with_csv_prefix(dir.path().join("out").to_string_lossy().to_string())
        .with_checkpoint_file(dir.path().join("checkpoint.json"))
}

fn output_files(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).unwrap().count()
}

#[tokio::test]
async fn test_missing_site_fails_before_export() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::paged(&["https://a/"], 1);
    let driver = ExportDriver::new(&client, config(&dir));

    let sites = vec!["https://a/".to_string(), "https://b/".to_string()];
    let err = driver
        .run(date(2021, 1, 1), date(2021, 1, 2), &sites)
        .await
        .unwrap_err();

    match err {
        ExportError::SitesUnavailable { missing } => {
            assert_eq!(missing, vec!["https://b/".to_string()]);
        }
        other => panic!("expected SitesUnavailable, got {other:?}"),
    }
    assert!(client.calls().is_empty());
    assert_eq!(output_files(&dir), 0);
}

#[tokio::test]
async fn test_site_urls_must_match_exactly() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::paged(&["https://a/"], 1);
    let driver = ExportDriver::new(&client, config(&dir));

    let err = driver
        .run(date(2021, 1, 1), date(2021, 1, 1), &["https://a".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::SitesUnavailable { .. }));
}

#[tokio::test]
async fn test_invalid_range_fails_before_listing_sites() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::paged(&["https://a/"], 1);
    let driver = ExportDriver::new(&client, config(&dir));

    let err = driver
        .run(date(2021, 1, 2), date(2021, 1, 1), &["https://a/".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::InvalidDateRange { .. }));
    assert_eq!(client.list_calls(), 0);
    assert_eq!(output_files(&dir), 0);
}

#[tokio::test]
async fn test_blank_sites_are_rejected() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::paged(&["https://a/"], 1);
    let driver = ExportDriver::new(&client, config(&dir));

    let err = driver
        .run(date(2021, 1, 1), date(2021, 1, 1), &[" ".to_string()])
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::NoSites));
    assert_eq!(client.list_calls(), 0);
}

#[tokio::test]
async fn test_verify_sites_accepts_available_sites() {
    let dir = TempDir::new().unwrap();
    let client = ScriptedClient::paged(&["https://a/", "https://b/"], 1);
    let driver = ExportDriver::new(&client, config(&dir));

    driver
        .verify_sites(&["https://b/".to_string()])
        .await
        .unwrap();
    assert_eq!(client.list_calls(), 1);
}
