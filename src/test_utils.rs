//! In-memory transport for exercising cursors and connections without a coordinator.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Value as JsonValue, json};

use crate::config::PrestoOptions;
use crate::driver::headers::{PRESTO_CLEAR_TRANSACTION_ID, PRESTO_STARTED_TRANSACTION_ID};
use crate::driver::{HttpMethod, StatementTransport, TransportRequest, TransportResponse};
use crate::error::PrestoTxnError;

/// Replays queued responses in order and records every request it is sent.
///
/// Once the queue is empty it answers with a finished, empty page, so statements whose
/// response does not matter need no scripting.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<TransportResponse>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a response for the next request.
    pub fn push(&self, response: TransportResponse) {
        lock(&self.responses).push_back(response);
    }

    /// Every request sent so far.
    #[must_use]
    pub fn requests(&self) -> Vec<TransportRequest> {
        lock(&self.requests).clone()
    }

    /// Bodies of the POSTed statements, in order.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        lock(&self.requests)
            .iter()
            .filter(|r| r.method == HttpMethod::Post)
            .filter_map(|r| r.body.clone())
            .collect()
    }

    /// The most recent POST.
    #[must_use]
    pub fn last_statement_request(&self) -> Option<TransportRequest> {
        lock(&self.requests)
            .iter()
            .rev()
            .find(|r| r.method == HttpMethod::Post)
            .cloned()
    }
}

#[async_trait]
impl StatementTransport for ScriptedTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, PrestoTxnError> {
        lock(&self.requests).push(request);
        let next = lock(&self.responses).pop_front();
        Ok(next.unwrap_or_else(|| finished_page(&[])))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Options pointing at a fake coordinator, with polling disabled.
#[must_use]
pub fn test_options() -> PrestoOptions {
    let mut options = PrestoOptions::new("localhost")
        .with_port(32767)
        .with_catalog("memory")
        .with_schema("default")
        .with_username("tester");
    options.poll_interval = Duration::ZERO;
    options
}

/// A response with a JSON body and the given headers.
///
/// # Panics
/// Panics if a header name or value is not valid HTTP.
#[must_use]
pub fn json_response(status: u16, body: &JsonValue, headers: &[(&str, &str)]) -> TransportResponse {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        map.insert(
            HeaderName::from_bytes(name.as_bytes()).expect("valid header name"),
            HeaderValue::from_str(value).expect("valid header value"),
        );
    }
    TransportResponse {
        status,
        headers: map,
        body: body.to_string(),
    }
}

/// A final page (no `nextUri`) without rows.
#[must_use]
pub fn finished_page(headers: &[(&str, &str)]) -> TransportResponse {
    json_response(
        200,
        &json!({"id": "query_1", "stats": {"state": "FINISHED"}}),
        headers,
    )
}

/// A final page announcing a freshly started transaction.
#[must_use]
pub fn started_transaction(transaction_id: &str) -> TransportResponse {
    finished_page(&[(PRESTO_STARTED_TRANSACTION_ID, transaction_id)])
}

/// A final page announcing the transaction is over.
#[must_use]
pub fn cleared_transaction() -> TransportResponse {
    finished_page(&[(PRESTO_CLEAR_TRANSACTION_ID, "true")])
}

/// A page carrying rows; `next_uri` keeps the query running.
#[must_use]
pub fn rows_page(
    columns: &[(&str, &str)],
    rows: &JsonValue,
    next_uri: Option<&str>,
) -> TransportResponse {
    let columns: Vec<JsonValue> = columns
        .iter()
        .map(|(name, ty)| json!({"name": name, "type": ty}))
        .collect();
    let state = if next_uri.is_some() { "RUNNING" } else { "FINISHED" };
    let mut body = json!({
        "id": "query_1",
        "columns": columns,
        "data": rows,
        "stats": {"state": state},
    });
    if let Some(uri) = next_uri {
        body["nextUri"] = json!(uri);
    }
    json_response(200, &body, &[])
}

/// A page with only a `nextUri`, as returned while the query is queued.
#[must_use]
pub fn queued_page(next_uri: &str, headers: &[(&str, &str)]) -> TransportResponse {
    json_response(
        200,
        &json!({"id": "query_1", "nextUri": next_uri, "stats": {"state": "QUEUED"}}),
        headers,
    )
}
