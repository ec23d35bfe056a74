//! Detection of optional storage columns.
//!
//! The payment store may predate the `marked_by` / `accepted_by` columns.
//! The detector probes the store once, optionally runs the one-shot
//! migration, and remembers the answer for the lifetime of the detector.

use crate::core::errors::LedgerError;
use crate::infrastructure::storage::Storage;
use log::{info, warn};
use tokio::sync::RwLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnState {
    Unknown,
    Available,
    Unavailable,
}

pub struct CapabilityDetector {
    auto_migrate: bool,
    payment_actor_columns: RwLock<ColumnState>,
}

impl CapabilityDetector {
    pub fn new(auto_migrate: bool) -> Self {
        CapabilityDetector {
            auto_migrate,
            payment_actor_columns: RwLock::new(ColumnState::Unknown),
        }
    }

    pub async fn state(&self) -> ColumnState {
        *self.payment_actor_columns.read().await
    }

    /// Forgets the cached answer so the next call probes again.
    pub async fn reset(&self) {
        *self.payment_actor_columns.write().await = ColumnState::Unknown;
    }

    pub async fn payment_actor_columns<S: Storage>(
        &self,
        storage: &S,
    ) -> Result<bool, LedgerError> {
        match self.state().await {
            ColumnState::Available => return Ok(true),
            ColumnState::Unavailable => return Ok(false),
            ColumnState::Unknown => {}
        }

        let mut state = self.payment_actor_columns.write().await;
        // Another caller may have probed while we waited for the lock.
        if *state != ColumnState::Unknown {
            return Ok(*state == ColumnState::Available);
        }

        let mut available = storage.has_payment_actor_columns().await?;
        if !available && self.auto_migrate {
            info!("Payment actor columns missing, running migration");
            storage.add_payment_actor_columns().await?;
            available = storage.has_payment_actor_columns().await?;
        }
        if !available {
            warn!(
                "Payment actor columns unavailable, payments will be stored without \
                 marked_by/accepted_by"
            );
        }

        *state = if available {
            ColumnState::Available
        } else {
            ColumnState::Unavailable
        };
        Ok(available)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::in_memory::InMemoryStorage;

    #[tokio::test]
    async fn caches_probe_result() {
        let storage = InMemoryStorage::new();
        let detector = CapabilityDetector::new(false);
        assert_eq!(detector.state().await, ColumnState::Unknown);
        assert!(detector.payment_actor_columns(&storage).await.unwrap());
        assert_eq!(detector.state().await, ColumnState::Available);
    }

    #[tokio::test]
    async fn legacy_store_without_migration_stays_unavailable() {
        let storage = InMemoryStorage::legacy();
        let detector = CapabilityDetector::new(false);
        assert!(!detector.payment_actor_columns(&storage).await.unwrap());
        assert_eq!(detector.state().await, ColumnState::Unavailable);

        // Columns added out of band are only noticed after a reset.
        storage.add_payment_actor_columns().await.unwrap();
        assert!(!detector.payment_actor_columns(&storage).await.unwrap());
        detector.reset().await;
        assert!(detector.payment_actor_columns(&storage).await.unwrap());
    }

    #[tokio::test]
    async fn legacy_store_is_migrated_once() {
        let storage = InMemoryStorage::legacy();
        let detector = CapabilityDetector::new(true);
        assert!(detector.payment_actor_columns(&storage).await.unwrap());
        assert!(storage.has_payment_actor_columns().await.unwrap());
    }
}
