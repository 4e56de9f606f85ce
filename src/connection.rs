use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{CloseBehavior, PrestoOptions};
use crate::cursor::TxnCursor;
use crate::driver::{HttpTransport, StatementTransport};
use crate::error::PrestoTxnError;
use crate::transaction::TransactionState;

pub const BEGIN_STATEMENT: &str = "start transaction";
pub const COMMIT_STATEMENT: &str = "commit";
pub const ROLLBACK_STATEMENT: &str = "rollback";

/// Connect to a coordinator over HTTP.
///
/// # Errors
/// Returns `PrestoTxnError` if the options are invalid or the HTTP client cannot be built.
pub fn connect(options: PrestoOptions) -> Result<TxnConnection, PrestoTxnError> {
    TxnConnection::connect(options)
}

/// Connection whose cursors share one transaction state.
///
/// The statement protocol is stateless, so there is nothing to open: a connection is the
/// stored options, a transport and the transaction id learned from responses.
pub struct TxnConnection {
    options: Arc<PrestoOptions>,
    transport: Arc<dyn StatementTransport>,
    transaction: TransactionState,
}

impl std::fmt::Debug for TxnConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxnConnection")
            .field("options", &self.options)
            .field("transaction", &self.transaction)
            .finish_non_exhaustive()
    }
}

impl TxnConnection {
    /// Validate `options` and connect over the default HTTP transport.
    ///
    /// # Errors
    /// Returns `ConfigError` for invalid options or `ConnectionError` if the HTTP client
    /// cannot be built.
    pub fn connect(options: PrestoOptions) -> Result<Self, PrestoTxnError> {
        options.validate()?;
        let transport = HttpTransport::new()?;
        Ok(Self::with_transport(options, Arc::new(transport)))
    }

    /// Build a connection over a caller-provided transport. Options are taken as given.
    #[must_use]
    pub fn with_transport(options: PrestoOptions, transport: Arc<dyn StatementTransport>) -> Self {
        Self {
            options: Arc::new(options),
            transport,
            transaction: TransactionState::new(),
        }
    }

    #[must_use]
    pub fn options(&self) -> &PrestoOptions {
        &self.options
    }

    /// The state shared with every cursor of this connection.
    #[must_use]
    pub fn transaction(&self) -> &TransactionState {
        &self.transaction
    }

    /// A new cursor sharing this connection's transaction state.
    #[must_use]
    pub fn cursor(&self) -> TxnCursor {
        TxnCursor::new(
            self.options.clone(),
            self.transport.clone(),
            self.transaction.clone(),
        )
    }

    /// Open a transaction. Always sends `start transaction`, whatever the current state.
    ///
    /// # Errors
    /// Returns the error of the underlying statement.
    pub async fn begin(&self) -> Result<(), PrestoTxnError> {
        self.run_to_completion(BEGIN_STATEMENT).await
    }

    /// Commit the open transaction; does nothing when none is active.
    ///
    /// # Errors
    /// Returns the error of the underlying statement.
    pub async fn commit(&self) -> Result<(), PrestoTxnError> {
        if !self.transaction.is_active() {
            return Ok(());
        }
        self.run_to_completion(COMMIT_STATEMENT).await
    }

    /// Roll back the open transaction; does nothing when none is active.
    ///
    /// # Errors
    /// Returns the error of the underlying statement.
    pub async fn rollback(&self) -> Result<(), PrestoTxnError> {
        if !self.transaction.is_active() {
            return Ok(());
        }
        self.run_to_completion(ROLLBACK_STATEMENT).await
    }

    /// Close the connection, first finishing an open transaction per `close_behavior`
    /// (commit by default).
    ///
    /// # Errors
    /// Returns the error of the commit or rollback.
    pub async fn close(self) -> Result<(), PrestoTxnError> {
        if self.transaction.is_active() {
            match self.options.close_behavior {
                CloseBehavior::Commit => {
                    info!(transaction_id = ?self.transaction.current(), "committing on close");
                    self.commit().await?;
                }
                CloseBehavior::Rollback => {
                    info!(transaction_id = ?self.transaction.current(), "rolling back on close");
                    self.rollback().await?;
                }
            }
        }
        Ok(())
    }

    async fn run_to_completion(&self, statement: &str) -> Result<(), PrestoTxnError> {
        let mut cursor = self.cursor();
        cursor.execute(statement, None).await?;
        cursor.fetchall().await?;
        Ok(())
    }
}

impl Drop for TxnConnection {
    fn drop(&mut self) {
        if self.transaction.is_active() {
            warn!(
                transaction_id = ?self.transaction.current(),
                "connection dropped with an open transaction; call close() to finish it"
            );
        }
    }
}
