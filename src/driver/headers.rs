//! Header names used by the Presto statement protocol.

pub const PRESTO_CATALOG: &str = "X-Presto-Catalog";
pub const PRESTO_SCHEMA: &str = "X-Presto-Schema";
pub const PRESTO_SOURCE: &str = "X-Presto-Source";
pub const PRESTO_USER: &str = "X-Presto-User";
pub const PRESTO_SESSION: &str = "X-Presto-Session";
pub const PRESTO_TRANSACTION_ID: &str = "X-Presto-Transaction-Id";

/// Response header carrying the id of a transaction the statement just opened.
pub const PRESTO_STARTED_TRANSACTION_ID: &str = "X-Presto-Started-Transaction-Id";
/// Response header signalling the session's transaction is over.
pub const PRESTO_CLEAR_TRANSACTION_ID: &str = "X-Presto-Clear-Transaction-Id";

/// Transaction id value sent while no transaction is open.
pub const NO_TRANSACTION: &str = "none";
