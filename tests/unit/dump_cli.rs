//! Argument parsing for the dump command

use clap::Parser;
use search_console_dump::cli::{Cli, CliError, Commands};
use search_console_dump::client::{Credentials, SearchType};
use search_console_dump::export::QueryModeSelection;
use search_console_dump::{DataState, ResumePolicy};
use std::time::Duration;

fn dump_args(cli: &Cli) -> &search_console_dump::cli::DumpArgs {
    match &cli.command {
        Commands::Dump(args) => args,
        other => panic!("expected dump command, got {other:?}"),
    }
}

#[test]
fn test_flags_map_onto_export_config() {
    let cli = Cli::try_parse_from([
        "search-console-dump",
        "dump",
        "--csv-prefix",
        "exports/gsc",
        "--sites",
        "https://a/,https://b/",
        "--max-retries",
        "4",
        "--retry-backoff-secs",
        "1",
        "--resume",
        "reset",
        "--query-mode",
        "noquery",
        "--data-state",
        "all",
        "--search-type",
        "image",
        "--row-limit",
        "1000",
    ])
    .unwrap();

    let args = dump_args(&cli);
    assert_eq!(args.sites, vec!["https://a/", "https://b/"]);

    let config = args.export_config();
    assert_eq!(config.csv_prefix, "exports/gsc");
    assert_eq!(config.resume_policy, ResumePolicy::Reset);
    assert_eq!(config.query_modes, QueryModeSelection::NoQueryOnly);
    assert_eq!(config.data_state, DataState::All);
    assert_eq!(config.search_type, SearchType::Image);
    assert_eq!(config.row_limit, 1000);
    assert_eq!(config.retry.max_attempts(), 5);
    assert_eq!(config.retry.backoff(), Duration::from_secs(1));
}

#[test]
fn test_resume_off_means_restart() {
    let cli = Cli::try_parse_from(["search-console-dump", "dump", "--resume", "off"]).unwrap();
    assert_eq!(dump_args(&cli).resume, ResumePolicy::Restart);
}

#[test]
fn test_row_limit_above_api_maximum_is_rejected() {
    let result = Cli::try_parse_from(["search-console-dump", "dump", "--row-limit", "25001"]);
    assert!(result.is_err());
}

#[test]
fn test_service_account_file_takes_precedence() {
    let cli = Cli::try_parse_from([
        "search-console-dump",
        "--service-account-file",
        "key.json",
        "--access-token",
        "token",
        "--api-base-url",
        "http://localhost:8080/",
        "dump",
    ])
    .unwrap();

    let config = cli.client_config().unwrap();
    assert!(matches!(config.credentials, Credentials::ServiceAccountFile(_)));
    assert_eq!(config.base_url, "http://localhost:8080");
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "search-console-dump",
        "dump",
        "--access-token",
        "token",
        "--timeout-secs",
        "5",
    ])
    .unwrap();

    let config = cli.client_config().unwrap();
    assert!(matches!(config.credentials, Credentials::AccessToken(_)));
    assert_eq!(config.timeout, Duration::from_secs(5));
}

#[test]
fn test_missing_credentials_is_configuration_error() {
    let cli = Cli::try_parse_from(["search-console-dump", "dump"]).unwrap();
    if cli.service_account_file.is_some() || cli.access_token.is_some() {
        // Credentials supplied by the environment
        return;
    }
    assert!(matches!(
        cli.client_config(),
        Err(CliError::ConfigurationError(_))
    ));
}
