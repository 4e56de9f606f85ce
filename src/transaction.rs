use std::sync::{Arc, Mutex, MutexGuard};

use reqwest::header::HeaderMap;
use tracing::debug;

use crate::driver::ResponseObserver;
use crate::driver::headers::{
    NO_TRANSACTION, PRESTO_CLEAR_TRANSACTION_ID, PRESTO_STARTED_TRANSACTION_ID,
};

/// Id of the transaction the coordinator last reported as open for this session.
///
/// Clones are handles to the same cell: a connection and every cursor it creates share one
/// state. The lock only guards individual reads and writes; cursors executing concurrently
/// on the same connection see each other's updates in no particular order.
#[derive(Debug, Clone, Default)]
pub struct TransactionState {
    transaction_id: Arc<Mutex<Option<String>>>,
}

impl TransactionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True while the coordinator has reported an open transaction.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.lock().is_some()
    }

    /// Record a server-assigned transaction id, replacing any previous one.
    pub fn set(&self, transaction_id: impl Into<String>) {
        *self.lock() = Some(transaction_id.into());
    }

    /// Back to "no active transaction".
    pub fn reset(&self) {
        *self.lock() = None;
    }

    /// Value for the outbound transaction header: the id, or `"none"`.
    #[must_use]
    pub fn display_id(&self) -> String {
        self.lock()
            .clone()
            .unwrap_or_else(|| NO_TRANSACTION.to_string())
    }

    #[must_use]
    pub fn current(&self) -> Option<String> {
        self.lock().clone()
    }

    /// Whether `other` is a handle to the same cell.
    #[must_use]
    pub fn shares_with(&self, other: &TransactionState) -> bool {
        Arc::ptr_eq(&self.transaction_id, &other.transaction_id)
    }

    fn lock(&self) -> MutexGuard<'_, Option<String>> {
        match self.transaction_id.lock() {
            Ok(guard) => guard,
            // Clear the poison and continue with the recovered id
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl ResponseObserver for TransactionState {
    fn observe(&self, headers: &HeaderMap) {
        if let Some(started) = headers
            .get(PRESTO_STARTED_TRANSACTION_ID)
            .and_then(|value| value.to_str().ok())
        {
            debug!(transaction_id = started, "transaction started");
            self.set(started);
        }
        if headers.contains_key(PRESTO_CLEAR_TRANSACTION_ID) {
            debug!("transaction cleared");
            self.reset();
        }
    }
}
