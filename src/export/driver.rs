//! Per-day export loop
//!
//! For every day from the resume point to the end date (inclusive) the driver
//! persists the checkpoint, writes one CSV file per configured query mode with
//! the rows of every site, then advances. The checkpoint is cleared only after
//! the last day completes.

use super::config::{date_range_warnings, dedup_sites, validate_date_range, ExportConfig};
use super::pager::Pager;
use super::{ExportError, ExportResult};
use crate::client::SearchAnalyticsClient;
use crate::metrics::{self, ExportMetrics};
use crate::output::{output_path, shape_row, CsvDayWriter, OutputWriter, RowWriter};
use crate::resume::CheckpointStore;
use chrono::NaiveDate;
use futures::TryStreamExt;
use indicatif::ProgressBar;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Totals of a completed export
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Days exported by this run
    pub days: u64,
    /// Rows written across all files
    pub rows: u64,
    /// Files written, in write order
    pub files: Vec<PathBuf>,
}

/// Every day from `start` to `end`, inclusive
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

/// Drives a resumable export against a [`SearchAnalyticsClient`]
pub struct ExportDriver<'a> {
    client: &'a dyn SearchAnalyticsClient,
    config: ExportConfig,
    progress: Option<ProgressBar>,
}

impl<'a> ExportDriver<'a> {
    /// Create a driver
    pub fn new(client: &'a dyn SearchAnalyticsClient, config: ExportConfig) -> Self {
        Self {
            client,
            config,
            progress: None,
        }
    }

    /// Report per-day progress on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Configuration of this driver
    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Fail unless every site in `sites` is readable by the account
    pub async fn verify_sites(&self, sites: &[String]) -> ExportResult<()> {
        let available = self.client.list_sites().await?;
        let available: HashSet<&str> = available.iter().map(|s| s.site_url.as_str()).collect();

        let missing: Vec<String> = sites
            .iter()
            .filter(|site| !available.contains(site.as_str()))
            .cloned()
            .collect();

        if !missing.is_empty() {
            for site in &missing {
                error!(site = %site, "Site not available to this account");
            }
            return Err(ExportError::SitesUnavailable { missing });
        }

        info!(count = sites.len(), "All requested sites are available");
        Ok(())
    }

    /// Export `start..=end` for `sites`, resuming from the checkpoint if any
    pub async fn run(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        sites: &[String],
    ) -> ExportResult<ExportSummary> {
        validate_date_range(start, end)?;

        let today = chrono::Utc::now().date_naive();
        for warning in date_range_warnings(start, end, today) {
            warn!("{}", warning);
        }

        let sites = dedup_sites(sites);
        if sites.is_empty() {
            return Err(ExportError::NoSites);
        }

        let run_metrics = ExportMetrics::start(start, end, sites.len());
        let result = self.run_days(start, end, &sites).await;

        match &result {
            Ok(summary) => run_metrics.record_success(summary.days, summary.rows),
            Err(e) => run_metrics.record_failure(&e.to_string()),
        }
        result
    }

    async fn run_days(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        sites: &[String],
    ) -> ExportResult<ExportSummary> {
        self.verify_sites(sites).await?;

        let mut store =
            CheckpointStore::new(&self.config.checkpoint_file, self.config.resume_policy);
        let next_day = store.load(start, end)?;

        let (range_start, range_end) = store
            .checkpoint()
            .map(|c| (c.start_date(), c.end_date()))
            .unwrap_or((start, end));

        if next_day != range_start {
            info!(next_day = %next_day, "Resuming from checkpoint");
        }

        if let Some(progress) = &self.progress {
            progress.set_length(((range_end - range_start).num_days() + 1) as u64);
            progress.set_position((next_day - range_start).num_days() as u64);
        }

        let mut summary = ExportSummary::default();

        for day in days_inclusive(next_day, range_end) {
            store.save(day)?;

            let (rows, files) = self
                .export_day(day, sites)
                .instrument(info_span!("export_day", day = %day))
                .await?;

            summary.days += 1;
            summary.rows += rows;
            summary.files.extend(files);
            metrics::record_day_completed();

            if let Some(progress) = &self.progress {
                progress.set_message(day.to_string());
                progress.inc(1);
            }
        }

        store.clear()?;

        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }

        info!(
            days = summary.days,
            rows = summary.rows,
            files = summary.files.len(),
            "Export finished"
        );
        Ok(summary)
    }

    async fn export_day(
        &self,
        day: NaiveDate,
        sites: &[String],
    ) -> ExportResult<(u64, Vec<PathBuf>)> {
        info!("Processing day");

        let pager = Pager::new(self.client, &self.config);
        let mut total_rows = 0;
        let mut files = Vec::new();

        for &mode in self.config.query_modes.modes() {
            let path = output_path(&self.config.csv_prefix, mode, day);
            let mut writer = CsvDayWriter::create(&path, mode)?;

            for site in sites {
                let mut rows = std::pin::pin!(pager.fetch_all(site, day, mode));
                let mut site_rows = 0u64;

                while let Some(row) = rows.try_next().await? {
                    writer.write_row(&shape_row(&row, mode)?)?;
                    site_rows += 1;
                }

                debug!(site = %site, mode = %mode, rows = site_rows, "Site exported");
            }

            let written = writer.close()?;
            metrics::record_rows_exported(mode.label(), written);
            total_rows += written;
            files.push(path);
        }

        Ok((total_rows, files))
    }
}
