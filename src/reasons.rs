//! Failure-reason ledger
//!
//! Durable map from transaction id to the human-readable reason a payment
//! provider gave for a decline (or an advisory note on a nominal success).
//! Entries are never deleted here; a later record for the same id wins.
//! Storage failures are swallowed so a full disk never breaks a transaction
//! flow.

use crate::storage::KeyValueStore;
use std::sync::Arc;
use tracing::{debug, warn};

const KEY_PREFIX: &str = "failure_reason:";

#[derive(Clone)]
pub struct FailureReasonLedger {
    store: Arc<dyn KeyValueStore>,
}

impl FailureReasonLedger {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(transaction_id: &str) -> String {
        format!("{}{}", KEY_PREFIX, transaction_id)
    }

    /// Associate `reason` with `transaction_id`, overwriting any prior value.
    ///
    /// No-op when either argument is absent or blank.
    pub async fn record(&self, transaction_id: Option<&str>, reason: Option<&str>) {
        let (Some(transaction_id), Some(reason)) = (
            transaction_id.map(str::trim).filter(|v| !v.is_empty()),
            reason.map(str::trim).filter(|v| !v.is_empty()),
        ) else {
            return;
        };

        match self.store.set(&Self::key(transaction_id), reason).await {
            Ok(()) => debug!(transaction_id, "failure reason recorded"),
            Err(e) => warn!(
                transaction_id,
                error = %e,
                "failed to persist failure reason, continuing without it"
            ),
        }
    }

    /// Reason recorded for `transaction_id`, if any.
    pub async fn lookup(&self, transaction_id: &str) -> Option<String> {
        let transaction_id = transaction_id.trim();
        if transaction_id.is_empty() {
            return None;
        }
        match self.store.get(&Self::key(transaction_id)).await {
            Ok(value) => value,
            Err(e) => {
                warn!(transaction_id, error = %e, "failed to read failure reason");
                None
            }
        }
    }
}
