//! Presto statement client with session-scoped transaction tracking.
//!
//! Every cursor created from a [`TxnConnection`] sends the connection's current transaction
//! id and updates it from the coordinator's response headers, so `begin`/`commit`/`rollback`
//! work across the otherwise stateless statement protocol.
//!
//! ```rust,no_run
//! use presto_txn::prelude::*;
//!
//! # async fn demo() -> Result<(), PrestoTxnError> {
//! let conn = PrestoOptionsBuilder::new("localhost")
//!     .port(32767)
//!     .catalog("memory")
//!     .build()?;
//! conn.begin().await?;
//! let mut cursor = conn.cursor();
//! cursor.execute("insert into b values (1)", None).await?;
//! cursor.fetchall().await?;
//! conn.commit().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connection;
pub mod cursor;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod prelude;
pub mod results;
pub mod transaction;
pub mod types;

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub use config::{CloseBehavior, PrestoOptions, PrestoOptionsBuilder};
pub use connection::{TxnConnection, connect};
pub use cursor::TxnCursor;
pub use dialect::{
    Dialect, Engine, PrestoDialect, TxnPrestoDialect, create_engine, register_txn_dialect,
};
pub use driver::{Params, PrestoCursor};
pub use error::PrestoTxnError;
pub use results::{CustomDbRow, ResultSet};
pub use transaction::TransactionState;
pub use types::{API_LEVEL, PARAMSTYLE, Protocol, RowValues, THREADSAFETY};
