//! In-memory store implementations for tests/dev.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use billbook_core::TenantId;
use billbook_documents::{Document, DocumentId};
use billbook_products::ProductId;

use super::r#trait::{
    DocumentStore, DocumentStoreError, SequenceStore, SequenceStoreError, StockStore,
    StockStoreError,
};

/// In-memory counter records.
///
/// The whole map sits behind one lock, so increment-or-create is trivially
/// atomic. Supports injecting legacy-index conflicts to exercise the
/// allocator's repair path.
#[derive(Debug, Default)]
pub struct InMemorySequenceStore {
    counters: RwLock<HashMap<(TenantId, String), u64>>,
    pending_conflicts: AtomicU32,
    repairs: AtomicU32,
}

impl InMemorySequenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` increments fail with a legacy-index conflict.
    pub fn inject_legacy_conflicts(&self, n: u32) {
        self.pending_conflicts.store(n, Ordering::SeqCst);
    }

    /// How many times `repair_key_index` ran.
    pub fn repair_count(&self) -> u32 {
        self.repairs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SequenceStore for InMemorySequenceStore {
    async fn increment_and_fetch(
        &self,
        tenant_id: TenantId,
        prefix: &str,
    ) -> Result<u64, SequenceStoreError> {
        if self
            .pending_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(SequenceStoreError::LegacyIndexConflict(
                "duplicate key on counters.prefix".to_string(),
            ));
        }

        let mut counters = self
            .counters
            .write()
            .map_err(|_| SequenceStoreError::Backend("lock poisoned".to_string()))?;
        let seq = counters
            .entry((tenant_id, prefix.to_string()))
            .or_insert(0);
        *seq += 1;
        Ok(*seq)
    }

    async fn peek(&self, tenant_id: TenantId, prefix: &str) -> Result<u64, SequenceStoreError> {
        let counters = self
            .counters
            .read()
            .map_err(|_| SequenceStoreError::Backend("lock poisoned".to_string()))?;
        Ok(counters
            .get(&(tenant_id, prefix.to_string()))
            .copied()
            .unwrap_or(0)
            + 1)
    }

    async fn repair_key_index(&self) -> Result<(), SequenceStoreError> {
        // Nothing to rebuild in memory; record the call for assertions.
        self.repairs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-memory stock levels.
///
/// Individual products can be poisoned to exercise the reconciler's
/// partial-application reporting.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    levels: RwLock<HashMap<(TenantId, ProductId), i64>>,
    poisoned: RwLock<HashSet<ProductId>>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every adjustment for `product_id` fail.
    pub fn fail_for(&self, product_id: ProductId) {
        if let Ok(mut poisoned) = self.poisoned.write() {
            poisoned.insert(product_id);
        }
    }

    /// All levels recorded for a tenant (dev/test listing).
    pub fn snapshot(&self, tenant_id: TenantId) -> Vec<(ProductId, i64)> {
        let levels = match self.levels.read() {
            Ok(m) => m,
            Err(_) => return vec![],
        };
        levels
            .iter()
            .filter_map(|((t, p), level)| (*t == tenant_id).then_some((*p, *level)))
            .collect()
    }
}

#[async_trait]
impl StockStore for InMemoryStockStore {
    async fn adjust(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        delta: i64,
    ) -> Result<i64, StockStoreError> {
        {
            let poisoned = self
                .poisoned
                .read()
                .map_err(|_| StockStoreError::Backend("lock poisoned".to_string()))?;
            if poisoned.contains(&product_id) {
                return Err(StockStoreError::Backend(format!(
                    "write rejected for product {product_id}"
                )));
            }
        }

        let mut levels = self
            .levels
            .write()
            .map_err(|_| StockStoreError::Backend("lock poisoned".to_string()))?;
        let level = levels.entry((tenant_id, product_id)).or_insert(0);
        *level += delta;
        Ok(*level)
    }

    async fn current(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<i64, StockStoreError> {
        let levels = self
            .levels
            .read()
            .map_err(|_| StockStoreError::Backend("lock poisoned".to_string()))?;
        Ok(levels.get(&(tenant_id, product_id)).copied().unwrap_or(0))
    }
}

/// In-memory document records.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<HashMap<(TenantId, DocumentId), Document>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn insert(&self, document: &Document) -> Result<(), DocumentStoreError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| DocumentStoreError::Backend("lock poisoned".to_string()))?;
        let key = (document.tenant_id, document.document_id);
        if documents.contains_key(&key) {
            return Err(DocumentStoreError::Duplicate(
                document.document_id.to_string(),
            ));
        }
        documents.insert(key, document.clone());
        Ok(())
    }

    async fn fetch(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> Result<Option<Document>, DocumentStoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| DocumentStoreError::Backend("lock poisoned".to_string()))?;
        Ok(documents.get(&(tenant_id, document_id)).cloned())
    }

    async fn persist(&self, document: &Document) -> Result<(), DocumentStoreError> {
        let mut documents = self
            .documents
            .write()
            .map_err(|_| DocumentStoreError::Backend("lock poisoned".to_string()))?;
        let key = (document.tenant_id, document.document_id);
        if !documents.contains_key(&key) {
            return Err(DocumentStoreError::NotFound);
        }
        documents.insert(key, document.clone());
        Ok(())
    }

    async fn list(&self, tenant_id: TenantId) -> Result<Vec<Document>, DocumentStoreError> {
        let documents = self
            .documents
            .read()
            .map_err(|_| DocumentStoreError::Backend("lock poisoned".to_string()))?;
        let mut out: Vec<Document> = documents
            .iter()
            .filter_map(|((t, _), doc)| (*t == tenant_id).then(|| doc.clone()))
            .collect();
        out.sort_by_key(|d| d.assigned_number);
        Ok(out)
    }
}
