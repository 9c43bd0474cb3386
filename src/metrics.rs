//! Export observability metrics
//!
//! Counters and histograms are always emitted through the `metrics` facade;
//! they only become visible when [`init_metrics`] installs the Prometheus
//! exporter (`--metrics-addr`). Without an installed recorder every call is a
//! no-op.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use once_cell::sync::OnceCell;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// API requests, labelled by endpoint and status
pub const API_REQUESTS_TOTAL: &str = "gsc_api_requests_total";
/// Retry attempts after transient failures
pub const API_RETRIES_TOTAL: &str = "gsc_api_retries_total";
/// Rows written to CSV, labelled by query mode
pub const ROWS_EXPORTED_TOTAL: &str = "gsc_rows_exported_total";
/// Days fully exported
pub const DAYS_COMPLETED_TOTAL: &str = "gsc_days_completed_total";
/// Wall time of one API page request
pub const PAGE_FETCH_DURATION_SECONDS: &str = "gsc_page_fetch_duration_seconds";
/// Time spent sleeping between retries
const RETRY_BACKOFF_SECONDS: &str = "gsc_retry_backoff_seconds";
/// Export runs, labelled by outcome
const EXPORTS_TOTAL: &str = "gsc_exports_total";

static METRICS_ADDR: OnceCell<SocketAddr> = OnceCell::new();

static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Install the Prometheus exporter on `addr`
///
/// Idempotent: later calls after a successful install are ignored.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    if let Some(existing) = METRICS_ADDR.get() {
        debug!(addr = %existing, "Metrics already initialized, skipping");
        return Ok(());
    }

    info!("Initializing metrics system on {}", addr);

    PrometheusBuilder::new().with_http_listener(addr).install()?;

    describe_counter!(
        API_REQUESTS_TOTAL,
        Unit::Count,
        "Total number of requests made to the reporting API"
    );
    describe_counter!(
        API_RETRIES_TOTAL,
        Unit::Count,
        "Total number of retried page requests"
    );
    describe_counter!(
        ROWS_EXPORTED_TOTAL,
        Unit::Count,
        "Total number of rows written to CSV files"
    );
    describe_counter!(
        DAYS_COMPLETED_TOTAL,
        Unit::Count,
        "Total number of days fully exported"
    );
    describe_histogram!(
        PAGE_FETCH_DURATION_SECONDS,
        Unit::Seconds,
        "Reporting API request duration in seconds"
    );
    describe_histogram!(
        RETRY_BACKOFF_SECONDS,
        Unit::Seconds,
        "Duration of retry backoff in seconds"
    );
    describe_counter!(EXPORTS_TOTAL, Unit::Count, "Export runs by outcome");

    let _ = METRICS_ADDR.set(addr);
    info!("Metrics system initialized successfully on {}", addr);
    Ok(())
}

/// Whether the Prometheus exporter has been installed
pub fn is_initialized() -> bool {
    METRICS_ADDR.get().is_some()
}

/// Generate a new correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{:08x}", id)
}

/// Timing and outcome of one API request
pub struct ApiRequestMetrics {
    endpoint: &'static str,
    start_time: Instant,
    correlation_id: String,
}

impl ApiRequestMetrics {
    /// Start recording a request to `endpoint`
    pub fn start(endpoint: &'static str) -> Self {
        let correlation_id = generate_correlation_id();
        debug!(correlation_id = %correlation_id, endpoint, "API request started");

        Self {
            endpoint,
            start_time: Instant::now(),
            correlation_id,
        }
    }

    /// Record a response with `status`
    pub fn record_status(&self, status: u16) {
        self.record(status.to_string());
    }

    /// Record a transport failure (no status)
    pub fn record_network_error(&self) {
        self.record("network_error".to_string());
    }

    /// Correlation ID of this request
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    fn record(&self, status: String) {
        let duration = self.start_time.elapsed();

        counter!(API_REQUESTS_TOTAL, "endpoint" => self.endpoint, "status" => status.clone())
            .increment(1);
        histogram!(PAGE_FETCH_DURATION_SECONDS, "endpoint" => self.endpoint)
            .record(duration.as_secs_f64());

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = self.endpoint,
            status = %status,
            duration_ms = duration.as_millis(),
            "API request completed"
        );
    }
}

/// Record a retry and the backoff preceding it
pub fn record_retry_backoff(duration: Duration, attempt: u32) {
    counter!(API_RETRIES_TOTAL, "attempt" => attempt.to_string()).increment(1);
    histogram!(RETRY_BACKOFF_SECONDS).record(duration.as_secs_f64());
}

/// Record rows written for one query mode
pub fn record_rows_exported(mode: &'static str, rows: u64) {
    counter!(ROWS_EXPORTED_TOTAL, "mode" => mode).increment(rows);
}

/// Record one fully exported day
pub fn record_day_completed() {
    counter!(DAYS_COMPLETED_TOTAL).increment(1);
}

/// Whole-run metrics
pub struct ExportMetrics {
    start_time: Instant,
}

impl ExportMetrics {
    /// Start tracking an export run
    pub fn start(start_date: chrono::NaiveDate, end_date: chrono::NaiveDate, sites: usize) -> Self {
        info!(%start_date, %end_date, sites, "Export started");
        Self {
            start_time: Instant::now(),
        }
    }

    /// Record a completed run
    pub fn record_success(&self, days: u64, rows: u64) {
        counter!(EXPORTS_TOTAL, "outcome" => "success").increment(1);
        info!(
            days,
            rows,
            duration_secs = self.start_time.elapsed().as_secs(),
            "Export completed successfully"
        );
    }

    /// Record a failed run
    pub fn record_failure(&self, error: &str) {
        counter!(EXPORTS_TOTAL, "outcome" => "failure").increment(1);
        error!(
            error = %error,
            duration_secs = self.start_time.elapsed().as_secs(),
            "Export failed"
        );
    }
}
