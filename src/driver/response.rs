use serde::Deserialize;
use serde_json::Value as JsonValue;

/// One page of the statement protocol, as returned by `POST /v1/statement` and by
/// every subsequent `GET nextUri`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementResponse {
    pub id: Option<String>,
    pub info_uri: Option<String>,
    pub partial_cancel_uri: Option<String>,
    /// Absent once the query has finished.
    pub next_uri: Option<String>,
    pub columns: Option<Vec<ColumnInfo>>,
    pub data: Option<Vec<Vec<JsonValue>>>,
    pub stats: Option<StatementStats>,
    pub error: Option<QueryError>,
    #[serde(default)]
    pub warnings: Vec<JsonValue>,
    pub update_type: Option<String>,
    pub update_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatementStats {
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub queued: bool,
    #[serde(default)]
    pub scheduled: bool,
    #[serde(default)]
    pub nodes: u64,
    #[serde(default)]
    pub total_splits: u64,
    #[serde(default)]
    pub completed_splits: u64,
    #[serde(default)]
    pub processed_rows: u64,
    #[serde(default)]
    pub processed_bytes: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryError {
    #[serde(default)]
    pub message: String,
    pub error_code: Option<i64>,
    pub error_name: Option<String>,
    pub error_type: Option<String>,
}

impl std::fmt::Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error_name {
            Some(name) => write!(f, "{name}: {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}
