//! Per-(tenant, prefix) sequence allocation.

use thiserror::Error;
use tracing::{instrument, warn};

use billbook_core::TenantId;

use crate::stores::{SequenceStore, SequenceStoreError};

/// Counter allocation error.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// The atomic increment failed even after the one permitted index repair.
    #[error("sequence allocation failed after index repair: {0}")]
    Fatal(String),

    #[error(transparent)]
    Store(#[from] SequenceStoreError),
}

/// Issues the next sequence value for a `(tenant, prefix)` numbering stream.
///
/// The allocator is the only component that touches counter records. It
/// guarantees strict uniqueness and monotonic non-decrease per key across
/// concurrent callers, by delegating to the store's atomic increment. It does
/// NOT guarantee gap-free numbering: a failed downstream step after
/// allocation consumes the number permanently.
#[derive(Debug, Clone)]
pub struct CounterAllocator<S> {
    store: S,
}

impl<S> CounterAllocator<S>
where
    S: SequenceStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Allocate the next value for the stream.
    ///
    /// When the store reports the legacy-index conflict signature, the key
    /// index is repaired and the increment retried exactly once — schemas
    /// evolve, and a counter table carried over from the single-tenant era
    /// still has a unique index on `prefix` alone. This is not a general
    /// retry policy; any second failure is fatal.
    #[instrument(skip(self), fields(tenant_id = %tenant_id.as_uuid(), prefix), err)]
    pub async fn allocate(
        &self,
        tenant_id: TenantId,
        prefix: &str,
    ) -> Result<u64, AllocationError> {
        match self.store.increment_and_fetch(tenant_id, prefix).await {
            Ok(seq) => Ok(seq),
            Err(SequenceStoreError::LegacyIndexConflict(msg)) => {
                warn!(
                    %tenant_id,
                    prefix,
                    "counter key rejected by legacy index, repairing: {msg}"
                );
                self.store
                    .repair_key_index()
                    .await
                    .map_err(|e| AllocationError::Fatal(e.to_string()))?;
                self.store
                    .increment_and_fetch(tenant_id, prefix)
                    .await
                    .map_err(|e| AllocationError::Fatal(e.to_string()))
            }
            Err(other) => Err(AllocationError::Store(other)),
        }
    }

    /// Preview the next value without issuing it.
    ///
    /// Purely advisory for display; another writer may take the value before
    /// the caller allocates.
    pub async fn peek_next(
        &self,
        tenant_id: TenantId,
        prefix: &str,
    ) -> Result<u64, AllocationError> {
        Ok(self.store.peek(tenant_id, prefix).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use super::*;
    use crate::stores::InMemorySequenceStore;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    #[tokio::test]
    async fn allocates_from_one() {
        let allocator = CounterAllocator::new(InMemorySequenceStore::new());
        let tenant = test_tenant_id();

        assert_eq!(allocator.allocate(tenant, "PUR").await.unwrap(), 1);
        assert_eq!(allocator.allocate(tenant, "PUR").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn streams_are_independent_per_prefix_and_tenant() {
        let allocator = CounterAllocator::new(InMemorySequenceStore::new());
        let tenant_a = test_tenant_id();
        let tenant_b = test_tenant_id();

        assert_eq!(allocator.allocate(tenant_a, "PUR").await.unwrap(), 1);
        assert_eq!(allocator.allocate(tenant_a, "PR").await.unwrap(), 1);
        assert_eq!(allocator.allocate(tenant_b, "PUR").await.unwrap(), 1);
        assert_eq!(allocator.allocate(tenant_a, "PUR").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn peek_never_mutates() {
        let allocator = CounterAllocator::new(InMemorySequenceStore::new());
        let tenant = test_tenant_id();

        for _ in 0..5 {
            assert_eq!(allocator.peek_next(tenant, "PUR").await.unwrap(), 1);
        }
        assert_eq!(allocator.allocate(tenant, "PUR").await.unwrap(), 1);
        assert_eq!(allocator.peek_next(tenant, "PUR").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn legacy_conflict_repairs_and_retries_once() {
        let store = Arc::new(InMemorySequenceStore::new());
        let allocator = CounterAllocator::new(store.clone());
        let tenant = test_tenant_id();

        store.inject_legacy_conflicts(1);
        assert_eq!(allocator.allocate(tenant, "PUR").await.unwrap(), 1);
        assert_eq!(store.repair_count(), 1);
    }

    #[tokio::test]
    async fn persistent_conflict_is_fatal() {
        let store = Arc::new(InMemorySequenceStore::new());
        let allocator = CounterAllocator::new(store.clone());
        let tenant = test_tenant_id();

        store.inject_legacy_conflicts(2);
        let err = allocator.allocate(tenant, "PUR").await.unwrap_err();
        assert!(matches!(err, AllocationError::Fatal(_)));
        // One repair, one retry — never a loop.
        assert_eq!(store.repair_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn concurrent_allocations_are_unique_and_dense() {
        let store = Arc::new(InMemorySequenceStore::new());
        let tenant = test_tenant_id();
        let n = 64u64;

        let mut handles = Vec::new();
        for _ in 0..n {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                CounterAllocator::new(store)
                    .allocate(tenant, "PUR")
                    .await
                    .unwrap()
            }));
        }

        let mut issued = BTreeSet::new();
        for handle in handles {
            issued.insert(handle.await.unwrap());
        }

        let expected: BTreeSet<u64> = (1..=n).collect();
        assert_eq!(issued, expected);
    }
}
