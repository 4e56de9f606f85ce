use std::sync::Arc;

use super::Dialect;
use super::registry::load_dialect;
use super::url::ConnectUrl;
use crate::config::PrestoOptions;
use crate::connection::TxnConnection;
use crate::driver::{Params, StatementTransport};
use crate::error::PrestoTxnError;
use crate::results::ResultSet;

/// Resolve `url`'s scheme through the dialect registry and build an engine for it.
///
/// ```rust,no_run
/// # use presto_txn::prelude::*;
/// # async fn demo() -> Result<(), PrestoTxnError> {
/// register_txn_dialect();
/// let engine = create_engine("prestotxn://localhost:32767/memory")?;
/// let tx = engine.begin().await?;
/// tx.execute("insert into b values (1)", None).await?;
/// tx.rollback().await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// Returns `PrestoTxnError::ConfigError` if the URL cannot be parsed, no dialect is
/// registered for its scheme, or the dialect rejects the connect arguments.
pub fn create_engine(url: &str) -> Result<Engine, PrestoTxnError> {
    let url = ConnectUrl::parse(url)?;
    let dialect = load_dialect(&url.scheme)?;
    let options = dialect.create_connect_args(&url)?;
    options.validate()?;
    Ok(Engine {
        url,
        dialect,
        options,
        transport: None,
    })
}

/// Connection factory bound to one dialect and one set of connect arguments.
pub struct Engine {
    url: ConnectUrl,
    dialect: Arc<dyn Dialect>,
    options: PrestoOptions,
    transport: Option<Arc<dyn StatementTransport>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("dialect", &self.dialect.name())
            .field("host", &self.url.host)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Route every connection of this engine through `transport` instead of HTTP.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn StatementTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    #[must_use]
    pub fn url(&self) -> &ConnectUrl {
        &self.url
    }

    #[must_use]
    pub fn options(&self) -> &PrestoOptions {
        &self.options
    }

    /// Open a new connection through the dialect.
    ///
    /// # Errors
    /// Returns `PrestoTxnError` if the dialect cannot connect.
    pub fn connect(&self) -> Result<EngineConnection, PrestoTxnError> {
        let conn = self
            .dialect
            .connect(self.options.clone(), self.transport.clone())?;
        Ok(EngineConnection {
            dialect: self.dialect.clone(),
            conn,
        })
    }

    /// Run one statement on a fresh connection and close it.
    ///
    /// # Errors
    /// Returns the statement's error, or the error of closing the connection.
    pub async fn execute(
        &self,
        statement: &str,
        params: Option<&Params>,
    ) -> Result<ResultSet, PrestoTxnError> {
        let conn = self.connect()?;
        let result = conn.execute(statement, params).await?;
        conn.close().await?;
        Ok(result)
    }

    /// Connect and begin a transaction through the dialect.
    ///
    /// # Errors
    /// Returns `PrestoTxnError` if connecting or beginning fails.
    pub async fn begin(&self) -> Result<EngineTransaction, PrestoTxnError> {
        self.connect()?.begin().await
    }
}

/// A connection checked out of an [`Engine`].
pub struct EngineConnection {
    dialect: Arc<dyn Dialect>,
    conn: TxnConnection,
}

impl std::fmt::Debug for EngineConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineConnection")
            .field("dialect", &self.dialect.name())
            .field("conn", &self.conn)
            .finish()
    }
}

impl EngineConnection {
    /// The underlying DB-API style connection.
    #[must_use]
    pub fn raw(&self) -> &TxnConnection {
        &self.conn
    }

    /// Execute a statement and drain it into a `ResultSet`.
    ///
    /// # Errors
    /// Returns the statement's error.
    pub async fn execute(
        &self,
        statement: &str,
        params: Option<&Params>,
    ) -> Result<ResultSet, PrestoTxnError> {
        let mut cursor = self.conn.cursor();
        cursor.execute(statement, params).await?;
        cursor.fetch_result_set().await
    }

    /// Begin a transaction through the dialect's `do_begin`.
    ///
    /// # Errors
    /// Returns the error of `do_begin`.
    pub async fn begin(self) -> Result<EngineTransaction, PrestoTxnError> {
        self.dialect.do_begin(&self.conn).await?;
        Ok(EngineTransaction { conn: self })
    }

    /// Close through the dialect's `do_close`.
    ///
    /// # Errors
    /// Returns the error of `do_close`.
    pub async fn close(self) -> Result<(), PrestoTxnError> {
        self.dialect.do_close(self.conn).await
    }
}

/// A connection with a transaction begun through the dialect.
#[derive(Debug)]
pub struct EngineTransaction {
    conn: EngineConnection,
}

impl EngineTransaction {
    #[must_use]
    pub fn connection(&self) -> &EngineConnection {
        &self.conn
    }

    /// # Errors
    /// Returns the statement's error.
    pub async fn execute(
        &self,
        statement: &str,
        params: Option<&Params>,
    ) -> Result<ResultSet, PrestoTxnError> {
        self.conn.execute(statement, params).await
    }

    /// Commit through the dialect and hand the connection back.
    ///
    /// # Errors
    /// Returns the error of `do_commit`.
    pub async fn commit(self) -> Result<EngineConnection, PrestoTxnError> {
        self.conn.dialect.do_commit(&self.conn.conn).await?;
        Ok(self.conn)
    }

    /// Roll back through the dialect and hand the connection back.
    ///
    /// # Errors
    /// Returns the error of `do_rollback`.
    pub async fn rollback(self) -> Result<EngineConnection, PrestoTxnError> {
        self.conn.dialect.do_rollback(&self.conn.conn).await?;
        Ok(self.conn)
    }
}
