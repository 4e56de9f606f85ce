//! Convenient imports for common functionality.

pub use crate::config::{CloseBehavior, PrestoOptions, PrestoOptionsBuilder};
pub use crate::connection::{TxnConnection, connect};
pub use crate::cursor::TxnCursor;
pub use crate::dialect::{
    ConnectUrl, Dialect, DialectRegistry, Engine, EngineConnection, EngineTransaction,
    PrestoDialect, TxnPrestoDialect, create_engine, load_dialect, register_dialect,
    register_txn_dialect,
};
pub use crate::driver::{
    ColumnDescription, CursorState, HttpTransport, ParamEscaper, Params, PrestoCursor,
    StatementTransport,
};
pub use crate::error::PrestoTxnError;
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::transaction::TransactionState;
pub use crate::types::{Protocol, RowValues};
