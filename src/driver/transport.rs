use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::header::HeaderMap;

use crate::error::PrestoTxnError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Post,
    Get,
    Delete,
}

/// A single request against the coordinator.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    /// Header name to value, in the order they were added.
    pub headers: IndexMap<String, String>,
    pub body: Option<String>,
    pub basic_auth: Option<(String, String)>,
}

impl TransportRequest {
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: IndexMap::new(),
            body: None,
            basic_auth: None,
        }
    }

    #[must_use]
    pub fn delete(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Delete,
            ..Self::get(url)
        }
    }

    #[must_use]
    pub fn post(url: impl Into<String>, body: String) -> Self {
        Self {
            method: HttpMethod::Post,
            body: Some(body),
            ..Self::get(url)
        }
    }

    #[must_use]
    pub fn with_headers(mut self, headers: IndexMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_basic_auth(mut self, basic_auth: Option<(String, String)>) -> Self {
        self.basic_auth = basic_auth;
        self
    }

    /// Case-insensitive header lookup.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Raw response; status handling and body parsing belong to the cursor.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl TransportResponse {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == 200
    }
}

/// Sends statement-protocol requests. Implement this to route requests through a custom
/// client, or to script responses in tests.
#[async_trait]
pub trait StatementTransport: Send + Sync {
    /// Perform one round trip.
    ///
    /// # Errors
    /// Returns `PrestoTxnError` if the request could not be sent or the body not read.
    async fn send(&self, request: TransportRequest)
    -> Result<TransportResponse, PrestoTxnError>;
}

/// `reqwest`-backed transport. Timeouts and TLS settings come from the wrapped client.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with a default `reqwest` client.
    ///
    /// # Errors
    /// Returns `PrestoTxnError::ConnectionError` if the client cannot be built.
    pub fn new() -> Result<Self, PrestoTxnError> {
        let client = reqwest::Client::builder().build().map_err(|e| {
            PrestoTxnError::ConnectionError(format!("Failed to build HTTP client: {e}"))
        })?;
        Ok(Self { client })
    }

    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StatementTransport for HttpTransport {
    async fn send(
        &self,
        request: TransportRequest,
    ) -> Result<TransportResponse, PrestoTxnError> {
        let method = match request.method {
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Delete => reqwest::Method::DELETE,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some((user, password)) = &request.basic_auth {
            builder = builder.basic_auth(user, Some(password));
        }
        if let Some(body) = request.body {
            builder = builder.body(body.into_bytes());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
