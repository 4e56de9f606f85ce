use std::collections::VecDeque;
use std::sync::Arc;

use indexmap::IndexMap;
use reqwest::header::HeaderMap;
use tracing::{debug, warn};

use super::headers::{PRESTO_CATALOG, PRESTO_SCHEMA, PRESTO_SESSION, PRESTO_SOURCE, PRESTO_USER};
use super::response::{ColumnInfo, StatementResponse, StatementStats};
use super::transport::{StatementTransport, TransportRequest, TransportResponse};
use crate::config::PrestoOptions;
use crate::error::PrestoTxnError;
use crate::results::ResultSet;
use crate::types::{Protocol, RowValues};

/// Hook run against the headers of every statement-protocol response, before the body is
/// processed and before a failing status is reported.
pub trait ResponseObserver: Send + Sync {
    fn observe(&self, headers: &HeaderMap);
}

/// Execution state of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// No statement has been submitted.
    None,
    /// The coordinator still has a `nextUri` for the current statement.
    Running,
    /// The last page has been received.
    Finished,
}

/// DB-API style column description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescription {
    pub name: String,
    pub type_name: String,
    pub display_size: Option<u32>,
    pub internal_size: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub null_ok: bool,
}

impl From<&ColumnInfo> for ColumnDescription {
    fn from(column: &ColumnInfo) -> Self {
        Self {
            name: column.name.clone(),
            type_name: column.type_name.clone(),
            display_size: None,
            internal_size: None,
            precision: None,
            scale: None,
            null_ok: true,
        }
    }
}

/// Paging cursor over the statement protocol.
///
/// Rows are buffered page by page; `fetch*` follow `nextUri` until enough rows are
/// available or the statement finishes.
pub struct PrestoCursor {
    options: Arc<PrestoOptions>,
    transport: Arc<dyn StatementTransport>,
    observer: Option<Arc<dyn ResponseObserver>>,
    state: CursorState,
    next_uri: Option<String>,
    columns: Option<Vec<ColumnInfo>>,
    data: VecDeque<Vec<RowValues>>,
    last_query_id: Option<String>,
    last_stats: Option<StatementStats>,
    update_count: Option<u64>,
    arraysize: usize,
}

impl std::fmt::Debug for PrestoCursor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrestoCursor")
            .field("host", &self.options.host)
            .field("port", &self.options.port)
            .field("state", &self.state)
            .field("last_query_id", &self.last_query_id)
            .field("buffered_rows", &self.data.len())
            .finish_non_exhaustive()
    }
}

impl PrestoCursor {
    #[must_use]
    pub fn new(options: Arc<PrestoOptions>, transport: Arc<dyn StatementTransport>) -> Self {
        Self {
            options,
            transport,
            observer: None,
            state: CursorState::None,
            next_uri: None,
            columns: None,
            data: VecDeque::new(),
            last_query_id: None,
            last_stats: None,
            update_count: None,
            arraysize: 1,
        }
    }

    /// Install a hook that sees the headers of every response this cursor processes.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn ResponseObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    #[must_use]
    pub fn options(&self) -> &PrestoOptions {
        &self.options
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.options.host
    }

    #[must_use]
    pub fn port(&self) -> u16 {
        self.options.port
    }

    #[must_use]
    pub fn catalog(&self) -> &str {
        &self.options.catalog
    }

    #[must_use]
    pub fn schema(&self) -> &str {
        &self.options.schema
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.options.username
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.options.source
    }

    #[must_use]
    pub fn protocol(&self) -> Protocol {
        self.options.protocol
    }

    #[must_use]
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Query id assigned by the coordinator to the last statement.
    #[must_use]
    pub fn last_query_id(&self) -> Option<&str> {
        self.last_query_id.as_deref()
    }

    /// Rows touched by the last DML statement, when the coordinator reports it.
    #[must_use]
    pub fn update_count(&self) -> Option<u64> {
        self.update_count
    }

    #[must_use]
    pub fn arraysize(&self) -> usize {
        self.arraysize
    }

    pub fn set_arraysize(&mut self, arraysize: usize) {
        self.arraysize = arraysize.max(1);
    }

    /// Catalog, schema, source and user headers.
    #[must_use]
    pub fn identity_headers(&self) -> IndexMap<String, String> {
        let mut headers = IndexMap::with_capacity(6);
        headers.insert(PRESTO_CATALOG.to_string(), self.options.catalog.clone());
        headers.insert(PRESTO_SCHEMA.to_string(), self.options.schema.clone());
        headers.insert(PRESTO_SOURCE.to_string(), self.options.source.clone());
        headers.insert(PRESTO_USER.to_string(), self.options.username.clone());
        headers
    }

    /// Session properties joined as `name=value,name=value`, or `None` when there are none.
    #[must_use]
    pub fn session_header(&self) -> Option<String> {
        if self.options.session_properties.is_empty() {
            return None;
        }
        Some(
            self.options
                .session_properties
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(","),
        )
    }

    /// Headers for a plain statement submission.
    #[must_use]
    pub fn request_headers(&self) -> IndexMap<String, String> {
        let mut headers = self.identity_headers();
        if let Some(session) = self.session_header() {
            headers.insert(PRESTO_SESSION.to_string(), session);
        }
        headers
    }

    /// Forget everything about the previous statement.
    pub fn reset_state(&mut self) {
        self.state = CursorState::None;
        self.next_uri = None;
        self.columns = None;
        self.data.clear();
        self.last_query_id = None;
        self.last_stats = None;
        self.update_count = None;
    }

    /// Submit `sql` with the base headers.
    ///
    /// # Errors
    /// Returns `PrestoTxnError` if the request fails, the coordinator answers with a
    /// non-success status, or the first page reports a query error.
    pub async fn execute(&mut self, sql: &str) -> Result<(), PrestoTxnError> {
        let headers = self.request_headers();
        self.submit(sql, headers).await
    }

    /// Reset, then POST `sql` to the statement endpoint with `headers` and process the
    /// first page.
    ///
    /// # Errors
    /// Same as [`PrestoCursor::execute`].
    pub async fn submit(
        &mut self,
        sql: &str,
        headers: IndexMap<String, String>,
    ) -> Result<(), PrestoTxnError> {
        self.reset_state();
        self.state = CursorState::Running;

        let request = TransportRequest::post(self.options.statement_url(), sql.to_string())
            .with_headers(headers)
            .with_basic_auth(self.basic_auth());
        let response = self.transport.send(request).await?;
        self.process_response(response)
    }

    /// Fold one response into the cursor state.
    ///
    /// # Errors
    /// Returns `OperationalError` for a non-200 status, `JsonError` for an unreadable body and
    /// `DatabaseError` when the page carries a query error.
    pub fn process_response(&mut self, response: TransportResponse) -> Result<(), PrestoTxnError> {
        if let Some(observer) = &self.observer {
            observer.observe(&response.headers);
        }

        if !response.is_success() {
            self.state = CursorState::Finished;
            self.next_uri = None;
            return Err(PrestoTxnError::OperationalError(format!(
                "Unexpected status code {}\n{}",
                response.status, response.body
            )));
        }

        let page: StatementResponse = serde_json::from_str(&response.body)?;
        debug!(query_id = ?page.id, next_uri = ?page.next_uri, "processed statement page");

        if page.id.is_some() {
            self.last_query_id = page.id;
        }
        self.next_uri = page.next_uri;
        if let Some(columns) = page.columns {
            self.columns = Some(columns);
        }
        if let Some(rows) = page.data {
            self.data.extend(
                rows.iter()
                    .map(|row| row.iter().map(RowValues::from_json).collect::<Vec<_>>()),
            );
        }
        if page.stats.is_some() {
            self.last_stats = page.stats;
        }
        if page.update_count.is_some() {
            self.update_count = page.update_count;
        }
        if self.next_uri.is_none() {
            self.state = CursorState::Finished;
        }
        for warning in &page.warnings {
            warn!(warning = %warning, "coordinator warning");
        }
        if let Some(error) = page.error {
            return Err(PrestoTxnError::DatabaseError(error.to_string()));
        }
        Ok(())
    }

    /// Column descriptions, paging until the coordinator has reported them.
    /// `None` before any statement or for statements without a result shape.
    ///
    /// # Errors
    /// Returns `PrestoTxnError` if fetching a page fails.
    pub async fn description(&mut self) -> Result<Option<Vec<ColumnDescription>>, PrestoTxnError> {
        while self.columns.is_none() && self.state == CursorState::Running {
            self.fetch_page().await?;
            if self.columns.is_none() && self.state == CursorState::Running {
                self.pause().await;
            }
        }
        Ok(self
            .columns
            .as_ref()
            .map(|columns| columns.iter().map(ColumnDescription::from).collect()))
    }

    /// Next row, or `None` once the statement is exhausted.
    ///
    /// # Errors
    /// Returns `ProgrammingError` before any statement ran, or whatever a page fetch fails with.
    pub async fn fetchone(&mut self) -> Result<Option<Vec<RowValues>>, PrestoTxnError> {
        self.ensure_executed()?;
        while self.data.is_empty() && self.state == CursorState::Running {
            self.fetch_page().await?;
            if self.data.is_empty() && self.state == CursorState::Running {
                self.pause().await;
            }
        }
        Ok(self.data.pop_front())
    }

    /// Up to `size` rows (`arraysize` when `None`).
    ///
    /// # Errors
    /// Same as [`PrestoCursor::fetchone`].
    pub async fn fetchmany(
        &mut self,
        size: Option<usize>,
    ) -> Result<Vec<Vec<RowValues>>, PrestoTxnError> {
        let size = size.unwrap_or(self.arraysize);
        let mut rows = Vec::with_capacity(size.min(self.data.len()));
        while rows.len() < size {
            match self.fetchone().await? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }

    /// All remaining rows; drains the statement to completion.
    ///
    /// # Errors
    /// Same as [`PrestoCursor::fetchone`].
    pub async fn fetchall(&mut self) -> Result<Vec<Vec<RowValues>>, PrestoTxnError> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetchone().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Drain the statement into a `ResultSet`.
    ///
    /// # Errors
    /// Same as [`PrestoCursor::fetchone`].
    pub async fn fetch_result_set(&mut self) -> Result<ResultSet, PrestoTxnError> {
        let column_names = self
            .description()
            .await?
            .map(|columns| columns.into_iter().map(|c| c.name).collect::<Vec<_>>())
            .unwrap_or_default();
        let rows = self.fetchall().await?;

        let mut result_set = ResultSet::with_capacity(rows.len());
        result_set.set_column_names(Arc::new(column_names));
        for row in rows {
            result_set.add_row_values(row);
        }
        if let Some(count) = self.update_count {
            result_set.rows_affected = usize::try_from(count).unwrap_or(usize::MAX);
        }
        Ok(result_set)
    }

    /// Fetch one more page without consuming rows and return the latest stats.
    /// `None` when the statement already finished.
    ///
    /// # Errors
    /// Returns `ProgrammingError` before any statement ran, or whatever the page fetch fails with.
    pub async fn poll(&mut self) -> Result<Option<StatementStats>, PrestoTxnError> {
        self.ensure_executed()?;
        if self.next_uri.is_none() {
            return Ok(None);
        }
        self.fetch_page().await?;
        Ok(self.last_stats.clone())
    }

    /// Cancel the running statement. Nothing is sent once it has finished.
    ///
    /// # Errors
    /// Returns `ProgrammingError` before any statement ran, `OperationalError` if the
    /// coordinator rejects the cancellation.
    pub async fn cancel(&mut self) -> Result<(), PrestoTxnError> {
        self.ensure_executed()?;
        let Some(next_uri) = self.next_uri.take() else {
            return Ok(());
        };
        self.state = CursorState::Finished;
        self.data.clear();

        let request = TransportRequest::delete(next_uri).with_basic_auth(self.basic_auth());
        let response = self.transport.send(request).await?;
        if !(200..300).contains(&response.status) {
            return Err(PrestoTxnError::OperationalError(format!(
                "Cancel failed with status code {}\n{}",
                response.status, response.body
            )));
        }
        Ok(())
    }

    async fn fetch_page(&mut self) -> Result<(), PrestoTxnError> {
        let Some(next_uri) = self.next_uri.clone() else {
            self.state = CursorState::Finished;
            return Ok(());
        };
        let request = TransportRequest::get(next_uri).with_basic_auth(self.basic_auth());
        let response = self.transport.send(request).await?;
        self.process_response(response)
    }

    async fn pause(&self) {
        if !self.options.poll_interval.is_zero() {
            tokio::time::sleep(self.options.poll_interval).await;
        }
    }

    fn ensure_executed(&self) -> Result<(), PrestoTxnError> {
        if self.state == CursorState::None {
            return Err(PrestoTxnError::ProgrammingError("No query yet".to_string()));
        }
        Ok(())
    }

    fn basic_auth(&self) -> Option<(String, String)> {
        self.options
            .password
            .as_ref()
            .map(|password| (self.options.username.clone(), password.clone()))
    }
}
