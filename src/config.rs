use std::time::Duration;

use indexmap::IndexMap;

use crate::connection::TxnConnection;
use crate::error::PrestoTxnError;
use crate::types::Protocol;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_CATALOG: &str = "hive";
pub const DEFAULT_SCHEMA: &str = "default";
pub const DEFAULT_SOURCE: &str = "presto-txn";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// What `TxnConnection::close` does with a transaction that is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CloseBehavior {
    /// Commit the open transaction before closing.
    #[default]
    Commit,
    /// Roll the open transaction back before closing.
    Rollback,
}

/// Options for talking to a Presto coordinator.
#[derive(Debug, Clone)]
pub struct PrestoOptions {
    pub host: String,
    pub port: u16,
    pub catalog: String,
    pub schema: String,
    pub username: String,
    pub password: Option<String>,
    pub source: String,
    pub protocol: Protocol,
    /// Sent as `X-Presto-Session`, in insertion order.
    pub session_properties: IndexMap<String, String>,
    /// Delay between polls of `nextUri` while a query has produced no rows yet.
    pub poll_interval: Duration,
    pub close_behavior: CloseBehavior,
}

impl PrestoOptions {
    /// Options with the coordinator defaults; the user comes from `$USER` (or `$USERNAME`).
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            catalog: DEFAULT_CATALOG.to_string(),
            schema: DEFAULT_SCHEMA.to_string(),
            username: default_username(),
            password: None,
            source: DEFAULT_SOURCE.to_string(),
            protocol: Protocol::Http,
            session_properties: IndexMap::new(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            close_behavior: CloseBehavior::Commit,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_catalog(mut self, catalog: impl Into<String>) -> Self {
        self.catalog = catalog.into();
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    #[must_use]
    pub fn with_session_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.session_properties.insert(name.into(), value.into());
        self
    }

    /// Statement endpoint, e.g. `http://localhost:8080/v1/statement`.
    #[must_use]
    pub fn statement_url(&self) -> String {
        format!(
            "{}://{}:{}/v1/statement",
            self.protocol, self.host, self.port
        )
    }

    /// Check that the options describe a usable coordinator.
    ///
    /// # Errors
    /// Returns `PrestoTxnError::ConfigError` when the host or user is missing, or when a
    /// password is combined with plain HTTP.
    pub fn validate(&self) -> Result<(), PrestoTxnError> {
        if self.host.trim().is_empty() {
            return Err(PrestoTxnError::ConfigError("host is required".to_string()));
        }
        if self.username.trim().is_empty() {
            return Err(PrestoTxnError::ConfigError(
                "username is required".to_string(),
            ));
        }
        if self.password.is_some() && self.protocol != Protocol::Https {
            return Err(PrestoTxnError::ConfigError(
                "protocol must be https when passing a password".to_string(),
            ));
        }
        Ok(())
    }
}

/// Fluent builder for Presto options.
#[derive(Debug, Clone)]
pub struct PrestoOptionsBuilder {
    opts: PrestoOptions,
}

impl PrestoOptionsBuilder {
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            opts: PrestoOptions::new(host),
        }
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.opts.port = port;
        self
    }

    #[must_use]
    pub fn catalog(mut self, catalog: impl Into<String>) -> Self {
        self.opts.catalog = catalog.into();
        self
    }

    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.opts.schema = schema.into();
        self
    }

    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.opts.username = username.into();
        self
    }

    #[must_use]
    pub fn password(mut self, password: Option<String>) -> Self {
        self.opts.password = password;
        self
    }

    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.opts.source = source.into();
        self
    }

    #[must_use]
    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.opts.protocol = protocol;
        self
    }

    #[must_use]
    pub fn session_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.opts.session_properties.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn poll_interval(mut self, poll_interval: Duration) -> Self {
        self.opts.poll_interval = poll_interval;
        self
    }

    #[must_use]
    pub fn close_behavior(mut self, close_behavior: CloseBehavior) -> Self {
        self.opts.close_behavior = close_behavior;
        self
    }

    /// Validate and return the options.
    ///
    /// # Errors
    /// Returns `PrestoTxnError::ConfigError` if validation fails.
    pub fn finish(self) -> Result<PrestoOptions, PrestoTxnError> {
        self.opts.validate()?;
        Ok(self.opts)
    }

    /// Build a connection over the default HTTP transport.
    ///
    /// # Errors
    /// Returns `PrestoTxnError` if validation or HTTP client creation fails.
    pub fn build(self) -> Result<TxnConnection, PrestoTxnError> {
        TxnConnection::connect(self.finish()?)
    }
}

fn default_username() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_url_uses_protocol_host_and_port() {
        let opts = PrestoOptionsBuilder::new("coordinator")
            .port(32767)
            .protocol(Protocol::Https)
            .username("etl")
            .finish()
            .expect("valid options");
        assert_eq!(opts.statement_url(), "https://coordinator:32767/v1/statement");
    }

    #[test]
    fn password_requires_https() {
        let err = PrestoOptionsBuilder::new("coordinator")
            .username("etl")
            .password(Some("secret".into()))
            .finish()
            .unwrap_err();
        assert!(matches!(err, PrestoTxnError::ConfigError(_)));
    }

    #[test]
    fn empty_username_is_rejected() {
        let err = PrestoOptions::new("coordinator")
            .with_username("")
            .validate()
            .unwrap_err();
        assert!(matches!(err, PrestoTxnError::ConfigError(msg) if msg.contains("username")));
    }

    #[test]
    fn session_properties_keep_insertion_order() {
        let opts = PrestoOptions::new("h")
            .with_session_property("b", "2")
            .with_session_property("a", "1");
        let keys: Vec<_> = opts.session_properties.keys().cloned().collect();
        assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
    }
}
