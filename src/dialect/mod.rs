// Dialect registration: lets `create_engine("prestotxn://...")` find the transaction-aware
// connection.
//
// - url: connect URL parsing
// - registry: name -> dialect factory, process-wide
// - engine: connection/transaction facade driven by a dialect

pub mod engine;
pub mod registry;
pub mod url;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::ValueEnum;

use crate::config::{CloseBehavior, DEFAULT_CATALOG, DEFAULT_PORT, DEFAULT_SCHEMA, PrestoOptions};
use crate::connection::TxnConnection;
use crate::driver::StatementTransport;
use crate::error::PrestoTxnError;
use crate::types::{Protocol, RowValues};

pub use engine::{Engine, EngineConnection, EngineTransaction, create_engine};
pub use registry::{
    DialectFactory, DialectRegistry, load_dialect, register_dialect, register_txn_dialect,
};
pub use url::ConnectUrl;

pub const PRESTO_DIALECT_NAME: &str = "presto";
pub const TXN_DIALECT_NAME: &str = "prestotxn";

/// How a generic engine talks to one kind of database.
///
/// The provided methods are the Presto behavior: the engine autocommits, so `do_begin` does
/// nothing, and commit/rollback go straight to the connection.
#[async_trait]
pub trait Dialect: Send + Sync {
    fn name(&self) -> &'static str;

    /// Turn a connect URL into connection options.
    ///
    /// The path is `catalog[/schema]` (defaults `hive` and `default`). Recognised query keys:
    /// `protocol`, `source`, `poll_interval` (seconds), `close_behavior` and
    /// `session.<property>`.
    ///
    /// # Errors
    /// Returns `PrestoTxnError::ConfigError` for a malformed path, unknown key or bad value.
    fn create_connect_args(&self, url: &ConnectUrl) -> Result<PrestoOptions, PrestoTxnError> {
        presto_connect_args(url)
    }

    /// Open a connection, over `transport` when given, otherwise over HTTP.
    ///
    /// # Errors
    /// Returns `PrestoTxnError` if the options are invalid or the transport cannot be built.
    fn connect(
        &self,
        options: PrestoOptions,
        transport: Option<Arc<dyn StatementTransport>>,
    ) -> Result<TxnConnection, PrestoTxnError> {
        match transport {
            Some(transport) => {
                options.validate()?;
                Ok(TxnConnection::with_transport(options, transport))
            }
            None => TxnConnection::connect(options),
        }
    }

    async fn do_begin(&self, _conn: &TxnConnection) -> Result<(), PrestoTxnError> {
        Ok(())
    }

    async fn do_commit(&self, conn: &TxnConnection) -> Result<(), PrestoTxnError> {
        conn.commit().await
    }

    async fn do_rollback(&self, conn: &TxnConnection) -> Result<(), PrestoTxnError> {
        conn.rollback().await
    }

    async fn do_close(&self, conn: TxnConnection) -> Result<(), PrestoTxnError> {
        conn.close().await
    }

    /// Double-quote an identifier, doubling embedded quotes.
    fn quote_identifier(&self, ident: &str) -> String {
        format!("\"{}\"", ident.replace('"', "\"\""))
    }

    async fn get_schema_names(&self, conn: &TxnConnection) -> Result<Vec<String>, PrestoTxnError> {
        first_column(conn, "SHOW SCHEMAS").await
    }

    async fn get_table_names(
        &self,
        conn: &TxnConnection,
        schema: Option<&str>,
    ) -> Result<Vec<String>, PrestoTxnError> {
        let query = match schema {
            Some(schema) => format!("SHOW TABLES FROM {}", self.quote_identifier(schema)),
            None => "SHOW TABLES".to_string(),
        };
        first_column(conn, &query).await
    }

    async fn has_table(
        &self,
        conn: &TxnConnection,
        table: &str,
        schema: Option<&str>,
    ) -> Result<bool, PrestoTxnError> {
        let tables = self.get_table_names(conn, schema).await?;
        Ok(tables.iter().any(|t| t.eq_ignore_ascii_case(table)))
    }
}

/// Stock Presto dialect.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrestoDialect;

#[async_trait]
impl Dialect for PrestoDialect {
    fn name(&self) -> &'static str {
        PRESTO_DIALECT_NAME
    }
}

/// Presto dialect whose `begin` really opens a transaction on the coordinator.
#[derive(Debug, Clone, Copy, Default)]
pub struct TxnPrestoDialect;

#[async_trait]
impl Dialect for TxnPrestoDialect {
    fn name(&self) -> &'static str {
        TXN_DIALECT_NAME
    }

    async fn do_begin(&self, conn: &TxnConnection) -> Result<(), PrestoTxnError> {
        conn.begin().await
    }
}

fn presto_connect_args(url: &ConnectUrl) -> Result<PrestoOptions, PrestoTxnError> {
    let mut options =
        PrestoOptions::new(url.host.clone()).with_port(url.port.unwrap_or(DEFAULT_PORT));
    if let Some(username) = &url.username {
        options.username.clone_from(username);
    }
    options.password.clone_from(&url.password);

    let database = url.database.as_deref().unwrap_or(DEFAULT_CATALOG);
    let parts: Vec<&str> = database.split('/').collect();
    match parts.as_slice() {
        [catalog] => {
            options.catalog = (*catalog).to_string();
            options.schema = DEFAULT_SCHEMA.to_string();
        }
        [catalog, schema] => {
            options.catalog = (*catalog).to_string();
            options.schema = (*schema).to_string();
        }
        _ => {
            return Err(PrestoTxnError::ConfigError(format!(
                "Unexpected database format {database}"
            )));
        }
    }

    for (key, value) in &url.query {
        match key.as_str() {
            "protocol" => {
                options.protocol = Protocol::from_str(value, true).map_err(|e| {
                    PrestoTxnError::ConfigError(format!("Invalid protocol '{value}': {e}"))
                })?;
            }
            "source" => options.source.clone_from(value),
            "poll_interval" => {
                let secs: f64 = value.parse().map_err(|e| {
                    PrestoTxnError::ConfigError(format!("Invalid poll_interval '{value}': {e}"))
                })?;
                options.poll_interval = Duration::try_from_secs_f64(secs).map_err(|e| {
                    PrestoTxnError::ConfigError(format!("Invalid poll_interval '{value}': {e}"))
                })?;
            }
            "close_behavior" => {
                options.close_behavior = match value.to_ascii_lowercase().as_str() {
                    "commit" => CloseBehavior::Commit,
                    "rollback" => CloseBehavior::Rollback,
                    other => {
                        return Err(PrestoTxnError::ConfigError(format!(
                            "Invalid close_behavior '{other}'"
                        )));
                    }
                };
            }
            other => match other.strip_prefix("session.") {
                Some(property) if !property.is_empty() => {
                    options
                        .session_properties
                        .insert(property.to_string(), value.clone());
                }
                _ => {
                    return Err(PrestoTxnError::ConfigError(format!(
                        "Unknown connect argument '{other}'"
                    )));
                }
            },
        }
    }

    Ok(options)
}

async fn first_column(conn: &TxnConnection, query: &str) -> Result<Vec<String>, PrestoTxnError> {
    let mut cursor = conn.cursor();
    cursor.execute(query, None).await?;
    let rows = cursor.fetchall().await?;
    Ok(rows
        .into_iter()
        .filter_map(|row| match row.into_iter().next() {
            Some(RowValues::Text(name)) => Some(name),
            _ => None,
        })
        .collect())
}
