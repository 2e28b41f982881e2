//! External collaborator boundaries.
//!
//! The engine consumes — but does not own — party enrichment and product name
//! resolution. These traits pin down the interface; the in-memory
//! implementations back dev/test wiring, and production adapters live with
//! whatever service owns the data.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use billbook_core::TenantId;
use billbook_parties::{PartyId, PartySnapshot};
use billbook_products::ProductId;

/// Collaborator lookup error.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("collaborator backend error: {0}")]
    Backend(String),
}

/// Read-only party enrichment.
///
/// A party that does not resolve is a caller problem (validation error at the
/// lifecycle boundary), not a retry candidate.
#[async_trait]
pub trait PartyDirectory: Send + Sync {
    async fn resolve(
        &self,
        tenant_id: TenantId,
        party_id: PartyId,
    ) -> Result<Option<PartySnapshot>, CollaboratorError>;
}

/// Product name resolution, used only for line items that lack an explicit
/// product id. Exact-match within the tenant.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    async fn find_by_name(
        &self,
        tenant_id: TenantId,
        name: &str,
    ) -> Result<Option<ProductId>, CollaboratorError>;
}

#[async_trait]
impl<D> PartyDirectory for Arc<D>
where
    D: PartyDirectory + ?Sized,
{
    async fn resolve(
        &self,
        tenant_id: TenantId,
        party_id: PartyId,
    ) -> Result<Option<PartySnapshot>, CollaboratorError> {
        (**self).resolve(tenant_id, party_id).await
    }
}

#[async_trait]
impl<C> ProductCatalog for Arc<C>
where
    C: ProductCatalog + ?Sized,
{
    async fn find_by_name(
        &self,
        tenant_id: TenantId,
        name: &str,
    ) -> Result<Option<ProductId>, CollaboratorError> {
        (**self).find_by_name(tenant_id, name).await
    }
}

/// In-memory party directory for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryPartyDirectory {
    parties: RwLock<HashMap<(TenantId, PartyId), PartySnapshot>>,
}

impl InMemoryPartyDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tenant_id: TenantId, snapshot: PartySnapshot) {
        if let Ok(mut parties) = self.parties.write() {
            parties.insert((tenant_id, snapshot.party_id), snapshot);
        }
    }
}

#[async_trait]
impl PartyDirectory for InMemoryPartyDirectory {
    async fn resolve(
        &self,
        tenant_id: TenantId,
        party_id: PartyId,
    ) -> Result<Option<PartySnapshot>, CollaboratorError> {
        let parties = self
            .parties
            .read()
            .map_err(|_| CollaboratorError::Backend("lock poisoned".to_string()))?;
        Ok(parties.get(&(tenant_id, party_id)).cloned())
    }
}

/// In-memory product catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryProductCatalog {
    by_name: RwLock<HashMap<(TenantId, String), ProductId>>,
}

impl InMemoryProductCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tenant_id: TenantId, name: impl Into<String>, product_id: ProductId) {
        if let Ok(mut by_name) = self.by_name.write() {
            by_name.insert((tenant_id, name.into()), product_id);
        }
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn find_by_name(
        &self,
        tenant_id: TenantId,
        name: &str,
    ) -> Result<Option<ProductId>, CollaboratorError> {
        let by_name = self
            .by_name
            .read()
            .map_err(|_| CollaboratorError::Backend("lock poisoned".to_string()))?;
        Ok(by_name.get(&(tenant_id, name.to_string())).copied())
    }
}
