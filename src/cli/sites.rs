//! CLI command for listing the sites visible to the credentials

use crate::client::{create_client, SiteEntry};
use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use super::Cli;

/// Sites subcommand
#[derive(Debug, Args)]
pub struct SitesCommand {
    /// Output format
    #[arg(long, default_value = "human")]
    format: OutputFormat,
}

/// Output format for the sites command
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}

impl SitesCommand {
    /// Execute the sites command
    pub async fn execute(&self, cli: &Cli) -> Result<()> {
        let client = create_client(&cli.client_config()?).context("Failed to create client")?;
        let sites = client.list_sites().await.context("Failed to list sites")?;

        print!("{}", render(&sites, self.format)?);
        Ok(())
    }
}

fn render(sites: &[SiteEntry], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let entries: Vec<_> = sites
                .iter()
                .map(|s| json!({"siteUrl": s.site_url, "permissionLevel": s.permission_level}))
                .collect();
            let mut out = serde_json::to_string_pretty(&json!({ "sites": entries }))?;
            out.push('\n');
            Ok(out)
        }
        OutputFormat::Human => {
            if sites.is_empty() {
                return Ok("No sites available to these credentials\n".to_string());
            }

            let width = sites.iter().map(|s| s.site_url.len()).max().unwrap_or(0);
            let mut out = format!("Found {} site(s):\n", sites.len());
            for site in sites {
                out.push_str(&format!(
                    "  {:<width$}  {}\n",
                    site.site_url, site.permission_level
                ));
            }
            Ok(out)
        }
    }
}
