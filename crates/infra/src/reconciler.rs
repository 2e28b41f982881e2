//! Stock delta reconciliation.
//!
//! Translates a document's line-item diff into signed per-product
//! adjustments and applies them to the stock store, one independent atomic
//! increment per product.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use billbook_core::TenantId;
use billbook_documents::{DeltaMap, DocumentType, LineItem, aggregate_quantities, signed_deltas};
use billbook_products::{ProductId, ProductRef};

use crate::collaborators::{CollaboratorError, ProductCatalog};
use crate::stores::StockStore;

/// Reconciliation error (product resolution only — application failures are
/// reported per product, not raised).
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("product resolution failed: {0}")]
    Catalog(#[from] CollaboratorError),
}

/// Outcome of applying a delta map.
///
/// Per-product increments are independent; a failure on one product never
/// rolls back the others. The failed set is the operator's reconciliation
/// signal, so it is always reported — degraded success, never masked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockApplyReport {
    /// New stock level per successfully adjusted product.
    pub applied: BTreeMap<ProductId, i64>,
    /// Error message per product whose adjustment failed.
    pub failed: BTreeMap<ProductId, String>,
}

impl StockApplyReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Computes and applies per-product stock deltas for document lifecycle
/// transitions.
#[derive(Debug, Clone)]
pub struct StockDeltaReconciler<C, S> {
    catalog: C,
    stock: S,
}

impl<C, S> StockDeltaReconciler<C, S>
where
    C: ProductCatalog,
    S: StockStore,
{
    pub fn new(catalog: C, stock: S) -> Self {
        Self { catalog, stock }
    }

    /// Net signed delta per product between two line-item lists.
    ///
    /// Product references resolve once, up front: explicit ids verbatim,
    /// names through the catalog. A line item that resolves to nothing is
    /// skipped — it affects no stock record (not every line maps to tracked
    /// inventory). Duplicate products aggregate before diffing, zero deltas
    /// are omitted.
    #[instrument(skip(self, prior_items, new_items), fields(tenant_id = %tenant_id.as_uuid(), %document_type), err)]
    pub async fn reconcile(
        &self,
        tenant_id: TenantId,
        document_type: DocumentType,
        prior_items: &[LineItem],
        new_items: &[LineItem],
    ) -> Result<DeltaMap, ReconcileError> {
        let prior = self.resolve_quantities(tenant_id, prior_items).await?;
        let new = self.resolve_quantities(tenant_id, new_items).await?;
        Ok(signed_deltas(document_type.stock_direction(), &prior, &new))
    }

    async fn resolve_quantities(
        &self,
        tenant_id: TenantId,
        items: &[LineItem],
    ) -> Result<BTreeMap<ProductId, i64>, ReconcileError> {
        let mut resolved = Vec::with_capacity(items.len());
        for line in items {
            match &line.product {
                ProductRef::ById(id) => resolved.push((*id, line.quantity)),
                ProductRef::ByName(name) => {
                    match self.catalog.find_by_name(tenant_id, name).await? {
                        Some(id) => resolved.push((id, line.quantity)),
                        None => {
                            debug!(%tenant_id, name, "line item matches no tracked product, skipped");
                        }
                    }
                }
            }
        }
        Ok(aggregate_quantities(resolved))
    }

    /// Apply a delta map, one atomic increment per product.
    ///
    /// There is no cross-product transaction; whatever applied stays applied.
    #[instrument(skip(self, deltas), fields(tenant_id = %tenant_id.as_uuid(), products = deltas.len()))]
    pub async fn apply(&self, tenant_id: TenantId, deltas: &DeltaMap) -> StockApplyReport {
        let mut report = StockApplyReport::default();

        for (product_id, delta) in deltas {
            match self.stock.adjust(tenant_id, *product_id, *delta).await {
                Ok(level) => {
                    report.applied.insert(*product_id, level);
                }
                Err(e) => {
                    report.failed.insert(*product_id, e.to_string());
                }
            }
        }

        if !report.is_complete() {
            let unadjusted: Vec<String> =
                report.failed.keys().map(ToString::to_string).collect();
            warn!(
                %tenant_id,
                ?unadjusted,
                "stock deltas partially applied; listed products were not adjusted"
            );
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::collaborators::InMemoryProductCatalog;
    use crate::stores::InMemoryStockStore;
    use billbook_core::AggregateId;

    fn pid() -> ProductId {
        ProductId::new(AggregateId::new())
    }

    fn setup() -> (
        Arc<InMemoryProductCatalog>,
        Arc<InMemoryStockStore>,
        StockDeltaReconciler<Arc<InMemoryProductCatalog>, Arc<InMemoryStockStore>>,
    ) {
        let catalog = Arc::new(InMemoryProductCatalog::new());
        let stock = Arc::new(InMemoryStockStore::new());
        let reconciler = StockDeltaReconciler::new(catalog.clone(), stock.clone());
        (catalog, stock, reconciler)
    }

    #[tokio::test]
    async fn resolves_names_through_the_catalog() {
        let (catalog, _stock, reconciler) = setup();
        let tenant = TenantId::new();
        let product = pid();
        catalog.register(tenant, "Widget", product);

        let deltas = reconciler
            .reconcile(
                tenant,
                DocumentType::Purchase,
                &[],
                &[LineItem::new(ProductRef::by_name("Widget"), 7, 100)],
            )
            .await
            .unwrap();

        assert_eq!(deltas.get(&product), Some(&7));
    }

    #[tokio::test]
    async fn unresolvable_line_item_is_inert() {
        let (_catalog, stock, reconciler) = setup();
        let tenant = TenantId::new();

        let deltas = reconciler
            .reconcile(
                tenant,
                DocumentType::Purchase,
                &[],
                &[LineItem::new(ProductRef::by_name("No Such Product"), 7, 100)],
            )
            .await
            .unwrap();

        assert!(deltas.is_empty());
        let report = reconciler.apply(tenant, &deltas).await;
        assert!(report.applied.is_empty());
        assert!(stock.snapshot(tenant).is_empty());
    }

    #[tokio::test]
    async fn duplicate_lines_aggregate() {
        let (_catalog, _stock, reconciler) = setup();
        let tenant = TenantId::new();
        let product = pid();

        let deltas = reconciler
            .reconcile(
                tenant,
                DocumentType::Purchase,
                &[],
                &[
                    LineItem::new(ProductRef::by_id(product), 3, 100),
                    LineItem::new(ProductRef::by_id(product), 4, 100),
                ],
            )
            .await
            .unwrap();

        assert_eq!(deltas.get(&product), Some(&7));
    }

    #[tokio::test]
    async fn apply_reports_new_levels() {
        let (_catalog, stock, reconciler) = setup();
        let tenant = TenantId::new();
        let product = pid();

        let deltas = reconciler
            .reconcile(
                tenant,
                DocumentType::Purchase,
                &[],
                &[LineItem::new(ProductRef::by_id(product), 10, 100)],
            )
            .await
            .unwrap();
        let report = reconciler.apply(tenant, &deltas).await;

        assert!(report.is_complete());
        assert_eq!(report.applied.get(&product), Some(&10));
        assert_eq!(stock.current(tenant, product).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn partial_failure_keeps_applied_increments() {
        let (_catalog, stock, reconciler) = setup();
        let tenant = TenantId::new();
        let good = pid();
        let bad = pid();
        stock.fail_for(bad);

        let deltas = reconciler
            .reconcile(
                tenant,
                DocumentType::Purchase,
                &[],
                &[
                    LineItem::new(ProductRef::by_id(good), 5, 100),
                    LineItem::new(ProductRef::by_id(bad), 5, 100),
                ],
            )
            .await
            .unwrap();
        let report = reconciler.apply(tenant, &deltas).await;

        assert!(!report.is_complete());
        assert_eq!(report.applied.get(&good), Some(&5));
        assert!(report.failed.contains_key(&bad));
        // No rollback of the product that made it through.
        assert_eq!(stock.current(tenant, good).await.unwrap(), 5);
        assert_eq!(stock.current(tenant, bad).await.unwrap(), 0);
    }
}
