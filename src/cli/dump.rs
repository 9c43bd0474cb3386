//! Top-level CLI definition and the `dump` command

use crate::client::search_console::DEFAULT_API_BASE_URL;
use crate::client::{create_client, ClientConfig, Credentials, SearchType};
use crate::export::config::{
    parse_date, validate_date_range, DEFAULT_CHECKPOINT_FILE, DEFAULT_CSV_PREFIX, DEFAULT_DATE,
    DEFAULT_SITES,
};
use crate::export::{ExportConfig, ExportDriver, ExportSummary, QueryModeSelection, RetryPolicy};
use crate::resume::ResumePolicy;
use crate::DataState;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::SecretString;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use super::{CliError, SitesCommand, ValidateCommand};

fn parse_secret(value: &str) -> Result<SecretString, String> {
    if value.trim().is_empty() {
        return Err("access token must not be empty".to_string());
    }
    Ok(SecretString::from(value.trim().to_string()))
}

/// Search Console dump CLI
#[derive(Parser, Debug)]
#[command(name = "search-console-dump")]
#[command(about = "Export daily Search Console analytics to CSV files", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Service account key file (JSON)
    #[arg(long, global = true, env = "GSC_SERVICE_ACCOUNT_FILE")]
    pub service_account_file: Option<PathBuf>,

    /// Pre-issued OAuth access token, used when no service account file is given
    #[arg(long, global = true, env = "GSC_ACCESS_TOKEN", hide_env_values = true, value_parser = parse_secret)]
    pub access_token: Option<SecretString>,

    /// API root URL
    #[arg(long, global = true, default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: String,

    /// OAuth token endpoint (defaults to the one in the key file)
    #[arg(long, global = true)]
    pub token_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true, default_value = "60", value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout_secs: u64,

    /// Serve Prometheus metrics on this address (e.g. 127.0.0.1:9090)
    #[arg(long, global = true)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Client settings from the global flags
    pub fn client_config(&self) -> Result<ClientConfig, CliError> {
        let credentials = match (&self.service_account_file, &self.access_token) {
            (Some(path), _) => Credentials::ServiceAccountFile(path.clone()),
            (None, Some(token)) => Credentials::AccessToken(token.clone()),
            (None, None) => {
                return Err(CliError::ConfigurationError(
                    "no credentials: pass --service-account-file or --access-token \
                     (or set GSC_SERVICE_ACCOUNT_FILE / GSC_ACCESS_TOKEN)"
                        .to_string(),
                ))
            }
        };

        let mut config = ClientConfig::new(credentials)
            .with_base_url(&self.api_base_url)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        if let Some(token_url) = &self.token_url {
            config = config.with_token_url(token_url);
        }
        Ok(config)
    }
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Export daily analytics for a date range
    Dump(DumpArgs),

    /// List the sites visible to the credentials
    Sites(SitesCommand),

    /// Validate a checkpoint file
    Validate(ValidateCommand),
}

/// Arguments of the `dump` command
#[derive(Parser, Debug)]
pub struct DumpArgs {
    /// Output file prefix; files are named <prefix>-<mode>-<YYYY-MM-DD>.csv
    #[arg(long, default_value = DEFAULT_CSV_PREFIX)]
    pub csv_prefix: String,

    /// First day to export (YYYY-MM-DD)
    #[arg(long, default_value = DEFAULT_DATE, value_parser = parse_date)]
    pub start_date: NaiveDate,

    /// Last day to export, inclusive (YYYY-MM-DD)
    #[arg(long, default_value = DEFAULT_DATE, value_parser = parse_date)]
    pub end_date: NaiveDate,

    /// Comma-separated site URLs
    #[arg(long, value_delimiter = ',', default_value = DEFAULT_SITES)]
    pub sites: Vec<String>,

    /// Additional attempts for a failed page request
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u32).range(0..=20))]
    pub max_retries: u32,

    /// Seconds to wait between attempts
    #[arg(long, default_value = "5")]
    pub retry_backoff_secs: u64,

    /// Checkpoint file
    #[arg(long, default_value = DEFAULT_CHECKPOINT_FILE)]
    pub checkpoint_file: PathBuf,

    /// Checkpoint handling: on (resume), off (restart on range change), reset
    #[arg(long, default_value = "on")]
    pub resume: ResumePolicy,

    /// Files written per day: both, query, noquery
    #[arg(long, default_value = "both")]
    pub query_mode: QueryModeSelection,

    /// Data state: final or all (includes fresh data)
    #[arg(long, default_value = "final")]
    pub data_state: DataState,

    /// Search type: web, image, video, news, discover, googleNews
    #[arg(long, default_value = "web")]
    pub search_type: SearchType,

    /// Rows per page (max 25000)
    #[arg(long, default_value = "25000", value_parser = clap::value_parser!(u32).range(1..=25000))]
    pub row_limit: u32,
}

impl DumpArgs {
    /// Export configuration from the command arguments
    pub fn export_config(&self) -> ExportConfig {
        ExportConfig::default()
            .with_csv_prefix(&self.csv_prefix)
            .with_checkpoint_file(&self.checkpoint_file)
            .with_resume_policy(self.resume)
            .with_query_modes(self.query_mode)
            .with_data_state(self.data_state)
            .with_search_type(self.search_type)
            .with_row_limit(self.row_limit)
            .with_retry(RetryPolicy::new(
                self.max_retries,
                Duration::from_secs(self.retry_backoff_secs),
            ))
    }

    /// Run the export
    pub async fn execute(&self, cli: &Cli) -> Result<ExportSummary, CliError> {
        // Date errors are reported before any credentials are touched
        validate_date_range(self.start_date, self.end_date)?;
        if self.sites.iter().all(|s| s.trim().is_empty()) {
            return Err(CliError::InvalidArgument("--sites must not be empty".to_string()));
        }

        let client = create_client(&cli.client_config()?)?;
        let driver = ExportDriver::new(client.as_ref(), self.export_config())
            .with_progress(create_progress_bar());

        info!(
            start_date = %self.start_date,
            end_date = %self.end_date,
            sites = ?self.sites,
            "Starting export"
        );

        let summary = driver
            .run(self.start_date, self.end_date, &self.sites)
            .await?;

        println!("Export complete");
        println!("Days exported: {}", summary.days);
        println!("Rows written: {}", summary.rows);
        println!("Files written: {}", summary.files.len());

        Ok(summary)
    }
}

/// Day progress bar on stderr
fn create_progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} days {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}
