use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use tracing::debug;

use super::{Dialect, PRESTO_DIALECT_NAME, PrestoDialect, TXN_DIALECT_NAME, TxnPrestoDialect};
use crate::error::PrestoTxnError;

pub type DialectFactory = fn() -> Arc<dyn Dialect>;

static REGISTRY: LazyLock<Mutex<DialectRegistry>> =
    LazyLock::new(|| Mutex::new(DialectRegistry::with_builtin()));

/// Dialect factories keyed by URL scheme.
#[derive(Debug, Clone, Default)]
pub struct DialectRegistry {
    factories: HashMap<String, DialectFactory>,
}

impl DialectRegistry {
    /// A registry that only knows the stock `presto` dialect.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::default();
        registry.register(PRESTO_DIALECT_NAME, presto_dialect);
        registry
    }

    /// Register (or replace) the factory for `name`. Names are case-insensitive.
    pub fn register(&mut self, name: &str, factory: DialectFactory) {
        self.factories.insert(name.to_ascii_lowercase(), factory);
    }

    /// Instantiate the dialect registered under `name`.
    ///
    /// # Errors
    /// Returns `PrestoTxnError::ConfigError` if nothing is registered under `name`.
    pub fn load(&self, name: &str) -> Result<Arc<dyn Dialect>, PrestoTxnError> {
        self.factories
            .get(&name.to_ascii_lowercase())
            .map(|factory| factory())
            .ok_or_else(|| {
                PrestoTxnError::ConfigError(format!("Can't load plugin: dialect '{name}'"))
            })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(&name.to_ascii_lowercase())
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }
}

fn global() -> MutexGuard<'static, DialectRegistry> {
    match REGISTRY.lock() {
        Ok(guard) => guard,
        // Clear the poison and continue with the recovered data
        Err(poisoned) => poisoned.into_inner(),
    }
}

fn presto_dialect() -> Arc<dyn Dialect> {
    Arc::new(PrestoDialect)
}

fn txn_dialect() -> Arc<dyn Dialect> {
    Arc::new(TxnPrestoDialect)
}

/// Register a dialect in the process-wide registry used by `create_engine`.
pub fn register_dialect(name: &str, factory: DialectFactory) {
    debug!(dialect = name, "registering dialect");
    global().register(name, factory);
}

/// Make `prestotxn://` URLs resolve to [`TxnPrestoDialect`].
pub fn register_txn_dialect() {
    register_dialect(TXN_DIALECT_NAME, txn_dialect);
}

/// Instantiate a dialect from the process-wide registry.
///
/// # Errors
/// Returns `PrestoTxnError::ConfigError` if nothing is registered under `name`.
pub fn load_dialect(name: &str) -> Result<Arc<dyn Dialect>, PrestoTxnError> {
    global().load(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_knows_presto_only() {
        let registry = DialectRegistry::with_builtin();
        assert_eq!(registry.names(), vec!["presto".to_string()]);
        assert!(registry.load("prestotxn").is_err());
    }

    #[test]
    fn registered_dialect_loads_case_insensitively() {
        let mut registry = DialectRegistry::with_builtin();
        registry.register("PrestoTxn", txn_dialect);
        assert!(registry.contains("prestotxn"));
        let dialect = registry.load("PRESTOTXN").expect("registered");
        assert_eq!(dialect.name(), "prestotxn");
    }

    #[test]
    fn global_registration_is_visible_to_load() {
        register_txn_dialect();
        assert_eq!(load_dialect("prestotxn").expect("registered").name(), "prestotxn");
        assert_eq!(load_dialect("presto").expect("builtin").name(), "presto");
    }
}
