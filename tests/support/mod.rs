//! Scripted in-memory reporting client shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use search_console_dump::client::{
    ApiRow, ClientError, ClientResult, QueryRequest, QueryResponse, SearchAnalyticsClient,
    SiteEntry,
};
use search_console_dump::{Dimension, QueryMode};
use std::collections::VecDeque;
use std::sync::Mutex;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One `query` call as seen by the client
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub site: String,
    pub day: NaiveDate,
    pub mode: QueryMode,
    pub start_row: u64,
}

type Handler = Box<dyn Fn(&str, &QueryRequest) -> ClientResult<QueryResponse> + Send + Sync>;

/// Client whose responses come from a handler or a fixed script
pub struct ScriptedClient {
    sites: Vec<String>,
    handler: Handler,
    calls: Mutex<Vec<RecordedCall>>,
    list_calls: Mutex<usize>,
}

impl ScriptedClient {
    /// Client answering every query with `handler`
    pub fn new(
        sites: &[&str],
        handler: impl Fn(&str, &QueryRequest) -> ClientResult<QueryResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            sites: sites.iter().map(|s| s.to_string()).collect(),
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            list_calls: Mutex::new(0),
        }
    }

    /// Every (site, day, mode) gets one page of `rows_per_day` rows, then an
    /// empty page
    pub fn paged(sites: &[&str], rows_per_day: usize) -> Self {
        Self::new(sites, move |_site, request| {
            if request.start_row == 0 {
                Ok(page_for(request, rows_per_day))
            } else {
                Ok(QueryResponse::default())
            }
        })
    }

    /// Responses served in order; an exhausted script yields empty pages
    pub fn scripted(sites: &[&str], script: Vec<ClientResult<QueryResponse>>) -> Self {
        let script = Mutex::new(VecDeque::from(script));
        Self::new(sites, move |_site, _request| {
            script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(QueryResponse::default()))
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        *self.list_calls.lock().unwrap()
    }

    /// Days requested (first page of the noquery mode), in request order
    pub fn days_requested(&self) -> Vec<NaiveDate> {
        self.calls()
            .into_iter()
            .filter(|c| c.mode == QueryMode::NoQuery && c.start_row == 0)
            .map(|c| c.day)
            .fold(Vec::new(), |mut days, day| {
                if days.last() != Some(&day) {
                    days.push(day);
                }
                days
            })
    }
}

#[async_trait]
impl SearchAnalyticsClient for ScriptedClient {
    async fn list_sites(&self) -> ClientResult<Vec<SiteEntry>> {
        *self.list_calls.lock().unwrap() += 1;
        Ok(self
            .sites
            .iter()
            .map(|site| SiteEntry {
                site_url: site.clone(),
                permission_level: "siteOwner".to_string(),
            })
            .collect())
    }

    async fn query(&self, site: &str, request: &QueryRequest) -> ClientResult<QueryResponse> {
        let mode = if request.dimensions.contains(&Dimension::Query) {
            QueryMode::Query
        } else {
            QueryMode::NoQuery
        };
        self.calls.lock().unwrap().push(RecordedCall {
            site: site.to_string(),
            day: request.start_date,
            mode,
            start_row: request.start_row,
        });
        (self.handler)(site, request)
    }
}

/// A row with keys matching the request's dimensions
pub fn row_for(request: &QueryRequest, index: usize) -> ApiRow {
    let keys = request
        .dimensions
        .iter()
        .map(|dimension| match dimension {
            Dimension::Query => format!("query {index}"),
            Dimension::Date => request.start_date.to_string(),
            Dimension::Page => format!("https://example.com/page/{index}"),
            Dimension::Country => "usa".to_string(),
            Dimension::Device => "DESKTOP".to_string(),
        })
        .collect();

    ApiRow {
        keys,
        clicks: index as f64,
        impressions: 10.0,
        ctr: 0.1,
        position: 2.5,
    }
}

/// A page of `rows` rows for `request`
pub fn page_for(request: &QueryRequest, rows: usize) -> QueryResponse {
    QueryResponse {
        rows: (0..rows).map(|i| row_for(request, i)).collect(),
        response_aggregation_type: None,
    }
}

/// A page of `rows` placeholder noquery rows
pub fn noquery_page(rows: usize) -> QueryResponse {
    QueryResponse {
        rows: (0..rows)
            .map(|_| ApiRow {
                keys: vec!["2021-01-01".into(), "usa".into(), "MOBILE".into()],
                clicks: 1.0,
                impressions: 1.0,
                ctr: 1.0,
                position: 1.0,
            })
            .collect(),
        response_aggregation_type: None,
    }
}

pub fn server_error() -> ClientError {
    ClientError::Http {
        status: 503,
        message: "backend unavailable".to_string(),
    }
}
