//! Offset pagination over `searchAnalytics.query`
//!
//! Each (site, day, mode) is fetched as a lazy stream of rows. The first page
//! starts at row 0; each following page starts at the previous offset plus the
//! number of rows the previous page returned. The stream ends at the first
//! page with no rows.

use super::config::{ExportConfig, RetryPolicy, MAX_PAGES_PER_QUERY};
use super::retry::query_with_retries;
use super::{ExportError, ExportResult};
use crate::client::{ApiRow, QueryRequest, SearchAnalyticsClient, SearchType};
use crate::{DataState, QueryMode};
use chrono::NaiveDate;
use futures::stream::{self, Stream, TryStreamExt};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct PageCursor {
    start_row: u64,
    pages: usize,
}

/// Paginated, retrying row source
#[derive(Clone, Copy)]
pub struct Pager<'a> {
    client: &'a dyn SearchAnalyticsClient,
    retry: RetryPolicy,
    data_state: DataState,
    search_type: SearchType,
    row_limit: u32,
    max_pages: usize,
}

impl<'a> Pager<'a> {
    /// Pager using the request and retry settings of `config`
    pub fn new(client: &'a dyn SearchAnalyticsClient, config: &ExportConfig) -> Self {
        Self {
            client,
            retry: config.retry,
            data_state: config.data_state,
            search_type: config.search_type,
            row_limit: config.row_limit,
            max_pages: MAX_PAGES_PER_QUERY,
        }
    }

    /// Override the page cap
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    fn request(&self, day: NaiveDate, mode: QueryMode) -> QueryRequest {
        QueryRequest::for_day(day, mode)
            .with_data_state(self.data_state)
            .with_search_type(self.search_type)
            .with_row_limit(self.row_limit)
    }

    /// Stream every row of `site` for `day` in `mode`.
    ///
    /// Pages are requested only as the stream is polled. A page that fails
    /// after retries ends the stream with that error.
    pub fn fetch_all(
        &self,
        site: &'a str,
        day: NaiveDate,
        mode: QueryMode,
    ) -> impl Stream<Item = ExportResult<ApiRow>> + 'a {
        let client = self.client;
        let retry = self.retry;
        let max_pages = self.max_pages;
        let template = self.request(day, mode);

        let cursor = PageCursor {
            start_row: 0,
            pages: 0,
        };

        stream::try_unfold(cursor, move |cursor| {
            let request = template.clone().with_start_row(cursor.start_row);
            async move {
                if cursor.pages >= max_pages {
                    return Err(ExportError::PageLimitExceeded {
                        site: site.to_string(),
                        day,
                        limit: max_pages,
                    });
                }

                debug!(
                    site = %site,
                    day = %day,
                    mode = %mode,
                    page = cursor.pages + 1,
                    start_row = cursor.start_row,
                    "Fetching page"
                );

                let response = query_with_retries(client, site, mode, &request, retry).await?;
                let received = response.rows.len();

                if received == 0 {
                    debug!(
                        site = %site,
                        day = %day,
                        mode = %mode,
                        total_rows = cursor.start_row,
                        pages = cursor.pages,
                        "Pagination complete"
                    );
                    return Ok(None);
                }

                debug!(received, "Received page");

                let next = PageCursor {
                    start_row: cursor.start_row + received as u64,
                    pages: cursor.pages + 1,
                };
                Ok(Some((response.rows, next)))
            }
        })
        .map_ok(|rows| stream::iter(rows.into_iter().map(Ok::<ApiRow, ExportError>)))
        .try_flatten()
    }
}
