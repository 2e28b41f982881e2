use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

use billbook_core::TenantId;
use billbook_documents::{Document, DocumentId};
use billbook_products::ProductId;

/// Sequence store operation error.
#[derive(Debug, Error)]
pub enum SequenceStoreError {
    /// The atomic increment was rejected by a unique-key violation whose
    /// signature points at a stale single-field index on the counter key
    /// (left behind by a pre-multi-tenant schema). The allocator owns the
    /// repair-and-retry policy for this variant.
    #[error("legacy index conflict: {0}")]
    LegacyIndexConflict(String),

    #[error("sequence store backend error: {0}")]
    Backend(String),
}

/// Stock store operation error.
#[derive(Debug, Error)]
pub enum StockStoreError {
    #[error("stock store backend error: {0}")]
    Backend(String),
}

/// Document store operation error.
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    /// Insert collided with an existing `(tenant_id, document_id)` key.
    #[error("duplicate document: {0}")]
    Duplicate(String),

    /// Overwrite targeted a document that is not persisted.
    #[error("document not found")]
    NotFound,

    #[error("document store backend error: {0}")]
    Backend(String),
}

/// Persisted per-`(tenant, prefix)` counter record access.
///
/// The counter is global mutable state scoped by its key; it is owned by the
/// allocator and never touched directly by other components. Implementations
/// must make `increment_and_fetch` a single atomic increment-or-create on the
/// backing store — a read-then-write sequence is racy and forbidden.
#[async_trait]
pub trait SequenceStore: Send + Sync {
    /// Atomically bump the counter for `(tenant_id, prefix)` and return the
    /// issued value, creating the record at `1` when absent.
    ///
    /// Concurrent callers for the same key must never observe the same value.
    async fn increment_and_fetch(
        &self,
        tenant_id: TenantId,
        prefix: &str,
    ) -> Result<u64, SequenceStoreError>;

    /// Read-only preview: `last_seq + 1`, or `1` when no record exists.
    ///
    /// Advisory only — the value can be stale by the time an allocation
    /// actually happens, and calling this must never mutate state.
    async fn peek(&self, tenant_id: TenantId, prefix: &str) -> Result<u64, SequenceStoreError>;

    /// Drop the incompatible legacy index on the counter key and ensure the
    /// compound unique index on `(tenant_id, prefix)`.
    async fn repair_key_index(&self) -> Result<(), SequenceStoreError>;
}

/// Persisted per-`(tenant, product)` stock level access.
///
/// Levels are signed — returns exceeding recorded purchases legitimately
/// drive a level negative, and that is not an error here.
#[async_trait]
pub trait StockStore: Send + Sync {
    /// Atomically add `delta` to the product's level, creating the record at
    /// zero when absent. Returns the new level.
    async fn adjust(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        delta: i64,
    ) -> Result<i64, StockStoreError>;

    /// Current level, zero when no record exists.
    async fn current(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<i64, StockStoreError>;
}

/// Persisted document records, keyed by `(tenant_id, document_id)`.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist a new document. Fails on key collision.
    async fn insert(&self, document: &Document) -> Result<(), DocumentStoreError>;

    /// Fetch one document, tenant-scoped. `None` when absent — callers decide
    /// whether that is an error.
    async fn fetch(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> Result<Option<Document>, DocumentStoreError>;

    /// Overwrite an existing document in place.
    async fn persist(&self, document: &Document) -> Result<(), DocumentStoreError>;

    /// All documents for a tenant, soft-deleted ones included.
    async fn list(&self, tenant_id: TenantId) -> Result<Vec<Document>, DocumentStoreError>;
}

#[async_trait]
impl<S> SequenceStore for Arc<S>
where
    S: SequenceStore + ?Sized,
{
    async fn increment_and_fetch(
        &self,
        tenant_id: TenantId,
        prefix: &str,
    ) -> Result<u64, SequenceStoreError> {
        (**self).increment_and_fetch(tenant_id, prefix).await
    }

    async fn peek(&self, tenant_id: TenantId, prefix: &str) -> Result<u64, SequenceStoreError> {
        (**self).peek(tenant_id, prefix).await
    }

    async fn repair_key_index(&self) -> Result<(), SequenceStoreError> {
        (**self).repair_key_index().await
    }
}

#[async_trait]
impl<S> StockStore for Arc<S>
where
    S: StockStore + ?Sized,
{
    async fn adjust(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        delta: i64,
    ) -> Result<i64, StockStoreError> {
        (**self).adjust(tenant_id, product_id, delta).await
    }

    async fn current(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<i64, StockStoreError> {
        (**self).current(tenant_id, product_id).await
    }
}

#[async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn insert(&self, document: &Document) -> Result<(), DocumentStoreError> {
        (**self).insert(document).await
    }

    async fn fetch(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> Result<Option<Document>, DocumentStoreError> {
        (**self).fetch(tenant_id, document_id).await
    }

    async fn persist(&self, document: &Document) -> Result<(), DocumentStoreError> {
        (**self).persist(document).await
    }

    async fn list(&self, tenant_id: TenantId) -> Result<Vec<Document>, DocumentStoreError> {
        (**self).list(tenant_id).await
    }
}
