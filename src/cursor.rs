use std::borrow::Cow;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::config::PrestoOptions;
use crate::driver::headers::{PRESTO_SESSION, PRESTO_TRANSACTION_ID};
use crate::driver::{
    ColumnDescription, CursorState, ParamEscaper, Params, PrestoCursor, ResponseObserver,
    StatementStats, StatementTransport,
};
use crate::error::PrestoTxnError;
use crate::results::ResultSet;
use crate::transaction::TransactionState;
use crate::types::RowValues;

/// Cursor that carries the connection's transaction id on every statement and learns about
/// transaction boundaries from the coordinator's response headers.
///
/// Everything except statement submission is delegated to the wrapped [`PrestoCursor`].
#[derive(Debug)]
pub struct TxnCursor {
    inner: PrestoCursor,
    transaction: TransactionState,
    escaper: ParamEscaper,
}

impl TxnCursor {
    #[must_use]
    pub fn new(
        options: Arc<PrestoOptions>,
        transport: Arc<dyn StatementTransport>,
        transaction: TransactionState,
    ) -> Self {
        let observer: Arc<dyn ResponseObserver> = Arc::new(transaction.clone());
        Self {
            inner: PrestoCursor::new(options, transport).with_observer(observer),
            transaction,
            escaper: ParamEscaper,
        }
    }

    /// The transaction state shared with the parent connection.
    #[must_use]
    pub fn transaction(&self) -> &TransactionState {
        &self.transaction
    }

    #[must_use]
    pub fn inner(&self) -> &PrestoCursor {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut PrestoCursor {
        &mut self.inner
    }

    /// Catalog, schema, source, user and current transaction id, plus the session header
    /// when session properties are configured.
    #[must_use]
    pub fn request_headers(&self) -> IndexMap<String, String> {
        let mut headers = self.inner.identity_headers();
        headers.insert(
            PRESTO_TRANSACTION_ID.to_string(),
            self.transaction.display_id(),
        );
        if let Some(session) = self.inner.session_header() {
            headers.insert(PRESTO_SESSION.to_string(), session);
        }
        headers
    }

    /// Run a statement, substituting `parameters` into it first when given.
    ///
    /// # Errors
    /// Returns `ParameterError` if substitution fails; transport, status and query errors
    /// come from the wrapped cursor unchanged.
    pub async fn execute(
        &mut self,
        statement: &str,
        parameters: Option<&Params>,
    ) -> Result<(), PrestoTxnError> {
        let headers = self.request_headers();

        let sql = match parameters {
            Some(params) => Cow::Owned(self.escaper.substitute(statement, params)?),
            None => Cow::Borrowed(statement),
        };

        info!(sql = %sql, "executing statement");
        debug!(headers = ?headers, "statement headers");

        self.inner.submit(&sql, headers).await
    }

    /// Run `statement` once per parameter set. Every run but the last is drained before the
    /// next one starts; the last stays open for fetching.
    ///
    /// # Errors
    /// Stops at and returns the first failure.
    pub async fn executemany(
        &mut self,
        statement: &str,
        seq_of_parameters: &[Params],
    ) -> Result<(), PrestoTxnError> {
        let Some((last, rest)) = seq_of_parameters.split_last() else {
            return Ok(());
        };
        for params in rest {
            self.execute(statement, Some(params)).await?;
            self.inner.fetchall().await?;
        }
        self.execute(statement, Some(last)).await
    }

    /// # Errors
    /// See [`PrestoCursor::fetchone`].
    pub async fn fetchone(&mut self) -> Result<Option<Vec<RowValues>>, PrestoTxnError> {
        self.inner.fetchone().await
    }

    /// # Errors
    /// See [`PrestoCursor::fetchmany`].
    pub async fn fetchmany(
        &mut self,
        size: Option<usize>,
    ) -> Result<Vec<Vec<RowValues>>, PrestoTxnError> {
        self.inner.fetchmany(size).await
    }

    /// # Errors
    /// See [`PrestoCursor::fetchall`].
    pub async fn fetchall(&mut self) -> Result<Vec<Vec<RowValues>>, PrestoTxnError> {
        self.inner.fetchall().await
    }

    /// # Errors
    /// See [`PrestoCursor::fetch_result_set`].
    pub async fn fetch_result_set(&mut self) -> Result<ResultSet, PrestoTxnError> {
        self.inner.fetch_result_set().await
    }

    /// # Errors
    /// See [`PrestoCursor::description`].
    pub async fn description(
        &mut self,
    ) -> Result<Option<Vec<ColumnDescription>>, PrestoTxnError> {
        self.inner.description().await
    }

    /// # Errors
    /// See [`PrestoCursor::poll`].
    pub async fn poll(&mut self) -> Result<Option<StatementStats>, PrestoTxnError> {
        self.inner.poll().await
    }

    /// # Errors
    /// See [`PrestoCursor::cancel`].
    pub async fn cancel(&mut self) -> Result<(), PrestoTxnError> {
        self.inner.cancel().await
    }

    #[must_use]
    pub fn state(&self) -> CursorState {
        self.inner.state()
    }

    #[must_use]
    pub fn last_query_id(&self) -> Option<&str> {
        self.inner.last_query_id()
    }

    #[must_use]
    pub fn arraysize(&self) -> usize {
        self.inner.arraysize()
    }

    pub fn set_arraysize(&mut self, arraysize: usize) {
        self.inner.set_arraysize(arraysize);
    }
}
