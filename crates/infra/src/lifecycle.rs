//! Document lifecycle coordination.
//!
//! Orchestrates the allocator and the reconciler across the three lifecycle
//! transitions a stock-affecting document can undergo — create, update, soft
//! delete. Each step commits independently against its own store; there is no
//! cross-entity transaction. The error variants name the step that failed so
//! operators can reconcile number/stock state by hand when a sequence is cut
//! short.

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use billbook_core::{DomainError, TenantId};
use billbook_documents::{
    Document, DocumentId, DocumentPayload, DocumentType, format_number,
};
use billbook_parties::PartySnapshot;

use crate::allocator::{AllocationError, CounterAllocator};
use crate::collaborators::{CollaboratorError, PartyDirectory, ProductCatalog};
use crate::reconciler::{ReconcileError, StockApplyReport, StockDeltaReconciler};
use crate::stores::{DocumentStore, DocumentStoreError, SequenceStore, StockStore};

/// Lifecycle operation error, annotated with the failing step.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Rejected before any write; resubmit corrected input.
    #[error("invalid input: {0}")]
    Input(String),

    /// Unknown document, foreign tenant, or already soft-deleted (for
    /// update).
    #[error("document not found")]
    NotFound,

    #[error("party resolution failed: {0}")]
    PartyResolution(#[source] CollaboratorError),

    #[error("number allocation failed: {0}")]
    NumberAllocation(#[from] AllocationError),

    #[error("document persistence failed: {0}")]
    Persistence(#[from] DocumentStoreError),

    #[error("stock reconciliation failed: {0}")]
    Reconciliation(#[from] ReconcileError),
}

impl From<DomainError> for LifecycleError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotFound => LifecycleError::NotFound,
            other => LifecycleError::Input(other.to_string()),
        }
    }
}

/// A lifecycle write result: the persisted document plus the stock outcome.
///
/// `stock.failed` being non-empty is degraded success — the document write
/// went through, some products were not adjusted.
#[derive(Debug, Clone)]
pub struct LifecycleOutcome {
    pub document: Document,
    pub stock: StockApplyReport,
}

/// Soft-delete result. Always `deleted: true` on success; a repeated delete
/// reports an empty stock outcome.
#[derive(Debug, Clone)]
pub struct DeleteOutcome {
    pub deleted: bool,
    pub stock: StockApplyReport,
}

/// Advisory preview of the next display number for a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberPreview {
    pub seq: u64,
    pub formatted: String,
}

/// Coordinates numbering, persistence and stock for document mutations.
pub struct DocumentLifecycleCoordinator<N, D, P, C, S> {
    allocator: CounterAllocator<N>,
    reconciler: StockDeltaReconciler<C, S>,
    documents: D,
    parties: P,
}

impl<N, D, P, C, S> DocumentLifecycleCoordinator<N, D, P, C, S>
where
    N: SequenceStore,
    D: DocumentStore,
    P: PartyDirectory,
    C: ProductCatalog,
    S: StockStore,
{
    pub fn new(sequences: N, documents: D, parties: P, catalog: C, stock: S) -> Self {
        Self {
            allocator: CounterAllocator::new(sequences),
            reconciler: StockDeltaReconciler::new(catalog, stock),
            documents,
            parties,
        }
    }

    async fn require_party(
        &self,
        tenant_id: TenantId,
        payload: &DocumentPayload,
    ) -> Result<PartySnapshot, LifecycleError> {
        self.parties
            .resolve(tenant_id, payload.party_id)
            .await
            .map_err(LifecycleError::PartyResolution)?
            .ok_or_else(|| {
                LifecycleError::Input(format!("party {} not found", payload.party_id))
            })
    }

    /// Create a document: validate, number, persist, then adjust stock.
    ///
    /// A failure after allocation leaves the number consumed (numbers are
    /// never reused); a failure after persistence leaves stock partially
    /// adjusted. Both are accepted trade-offs of the per-step commit model.
    #[instrument(
        skip(self, payload),
        fields(tenant_id = %tenant_id.as_uuid(), %document_type),
        err
    )]
    pub async fn create(
        &self,
        tenant_id: TenantId,
        document_type: DocumentType,
        payload: DocumentPayload,
    ) -> Result<LifecycleOutcome, LifecycleError> {
        payload.validate()?;
        let party = self.require_party(tenant_id, &payload).await?;

        let seq = self
            .allocator
            .allocate(tenant_id, document_type.prefix())
            .await?;

        let document = Document::create(
            tenant_id,
            DocumentId::new(billbook_core::AggregateId::new()),
            document_type,
            seq,
            party.party_id,
            party.name,
            payload.line_items,
            Utc::now(),
        );
        self.documents.insert(&document).await?;

        let deltas = self
            .reconciler
            .reconcile(tenant_id, document_type, &[], &document.line_items)
            .await?;
        let stock = self.reconciler.apply(tenant_id, &deltas).await;

        Ok(LifecycleOutcome { document, stock })
    }

    /// Replace a document's mutable fields, adjusting stock by the diff
    /// against the persisted state.
    ///
    /// Stock applies BEFORE the new item list persists: a crash in between
    /// re-runs reconcile against stored-vs-stored on retry, which at worst
    /// double-applies a delta — preferred over stock silently missing an
    /// already-persisted change.
    #[instrument(
        skip(self, payload),
        fields(tenant_id = %tenant_id.as_uuid(), document_id = %document_id),
        err
    )]
    pub async fn update(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
        payload: DocumentPayload,
    ) -> Result<LifecycleOutcome, LifecycleError> {
        payload.validate()?;

        let mut document = self
            .documents
            .fetch(tenant_id, document_id)
            .await?
            .filter(Document::is_active)
            .ok_or(LifecycleError::NotFound)?;

        if let Some(number) = payload.assigned_number {
            if number != document.assigned_number {
                return Err(LifecycleError::Input(
                    "assigned number is immutable".to_string(),
                ));
            }
        }

        let party = self.require_party(tenant_id, &payload).await?;

        let deltas = self
            .reconciler
            .reconcile(
                tenant_id,
                document.document_type,
                &document.line_items,
                &payload.line_items,
            )
            .await?;
        let stock = self.reconciler.apply(tenant_id, &deltas).await;

        document.apply_update(party.party_id, party.name, payload.line_items, Utc::now());
        self.documents.persist(&document).await?;

        Ok(LifecycleOutcome { document, stock })
    }

    /// Soft-delete a document, reversing its full stock contribution.
    ///
    /// Idempotent: deleting an already-deleted document succeeds without
    /// touching stock again.
    #[instrument(
        skip(self),
        fields(tenant_id = %tenant_id.as_uuid(), document_id = %document_id),
        err
    )]
    pub async fn delete(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> Result<DeleteOutcome, LifecycleError> {
        let mut document = self
            .documents
            .fetch(tenant_id, document_id)
            .await?
            .ok_or(LifecycleError::NotFound)?;

        if document.is_deleted {
            return Ok(DeleteOutcome {
                deleted: true,
                stock: StockApplyReport::default(),
            });
        }

        let deltas = self
            .reconciler
            .reconcile(
                tenant_id,
                document.document_type,
                &document.line_items,
                &[],
            )
            .await?;
        let stock = self.reconciler.apply(tenant_id, &deltas).await;

        document.mark_deleted(Utc::now());
        self.documents.persist(&document).await?;

        Ok(DeleteOutcome {
            deleted: true,
            stock,
        })
    }

    /// Fetch one document (active or deleted), tenant-scoped.
    pub async fn fetch(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> Result<Document, LifecycleError> {
        self.documents
            .fetch(tenant_id, document_id)
            .await?
            .ok_or(LifecycleError::NotFound)
    }

    /// Advisory preview of the next number for a stream. Non-mutating and
    /// possibly stale by the time a create lands.
    pub async fn peek_next_number(
        &self,
        tenant_id: TenantId,
        document_type: DocumentType,
    ) -> Result<NumberPreview, LifecycleError> {
        let prefix = document_type.prefix();
        let seq = self.allocator.peek_next(tenant_id, prefix).await?;
        Ok(NumberPreview {
            seq,
            formatted: format_number(prefix, seq),
        })
    }
}
