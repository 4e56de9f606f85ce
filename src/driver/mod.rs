// Base Presto statement client.
//
// - headers: request/response header names
// - response: wire model of the statement protocol
// - transport: HTTP seam (reqwest-backed by default)
// - escape: pyformat parameter substitution
// - cursor: paging cursor with a response observer hook

pub mod cursor;
pub mod escape;
pub mod headers;
pub mod response;
pub mod transport;

pub use cursor::{ColumnDescription, CursorState, PrestoCursor, ResponseObserver};
pub use escape::{ParamEscaper, Params};
pub use response::{ColumnInfo, QueryError, StatementResponse, StatementStats};
pub use transport::{
    HttpMethod, HttpTransport, StatementTransport, TransportRequest, TransportResponse,
};
