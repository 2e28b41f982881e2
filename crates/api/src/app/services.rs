use std::sync::Arc;

use billbook_core::TenantId;
use billbook_documents::{Document, DocumentId, DocumentPayload, DocumentType};
use billbook_infra::collaborators::{InMemoryPartyDirectory, InMemoryProductCatalog};
use billbook_infra::stores::{
    InMemoryDocumentStore, InMemorySequenceStore, InMemoryStockStore, PostgresDocumentStore,
    PostgresSequenceStore, PostgresStockStore,
};
use billbook_infra::{
    DeleteOutcome, DocumentLifecycleCoordinator, LifecycleError, LifecycleOutcome, NumberPreview,
};
use billbook_parties::PartySnapshot;
use billbook_products::ProductId;
use sqlx::PgPool;

type InMemoryCoordinator = DocumentLifecycleCoordinator<
    Arc<InMemorySequenceStore>,
    Arc<InMemoryDocumentStore>,
    Arc<InMemoryPartyDirectory>,
    Arc<InMemoryProductCatalog>,
    Arc<InMemoryStockStore>,
>;

type PersistentCoordinator = DocumentLifecycleCoordinator<
    PostgresSequenceStore,
    PostgresDocumentStore,
    Arc<InMemoryPartyDirectory>,
    Arc<InMemoryProductCatalog>,
    PostgresStockStore,
>;

/// Wired application services.
///
/// The party directory and product catalog run in-memory in both modes —
/// their production adapters belong to the services that own that data.
pub enum AppServices {
    InMemory {
        coordinator: Arc<InMemoryCoordinator>,
        parties: Arc<InMemoryPartyDirectory>,
        catalog: Arc<InMemoryProductCatalog>,
    },
    Persistent {
        coordinator: Arc<PersistentCoordinator>,
        parties: Arc<InMemoryPartyDirectory>,
        catalog: Arc<InMemoryProductCatalog>,
    },
}

pub async fn build_services() -> AppServices {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        return build_persistent_services().await;
    }

    build_in_memory_services()
}

fn build_in_memory_services() -> AppServices {
    let parties = Arc::new(InMemoryPartyDirectory::new());
    let catalog = Arc::new(InMemoryProductCatalog::new());

    let coordinator = Arc::new(DocumentLifecycleCoordinator::new(
        Arc::new(InMemorySequenceStore::new()),
        Arc::new(InMemoryDocumentStore::new()),
        parties.clone(),
        catalog.clone(),
        Arc::new(InMemoryStockStore::new()),
    ));

    AppServices::InMemory {
        coordinator,
        parties,
        catalog,
    }
}

async fn build_persistent_services() -> AppServices {
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");

    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to Postgres");

    let parties = Arc::new(InMemoryPartyDirectory::new());
    let catalog = Arc::new(InMemoryProductCatalog::new());

    let coordinator = Arc::new(DocumentLifecycleCoordinator::new(
        PostgresSequenceStore::new(pool.clone()),
        PostgresDocumentStore::new(pool.clone()),
        parties.clone(),
        catalog.clone(),
        PostgresStockStore::new(pool),
    ));

    AppServices::Persistent {
        coordinator,
        parties,
        catalog,
    }
}

impl AppServices {
    pub async fn create_document(
        &self,
        tenant_id: TenantId,
        document_type: DocumentType,
        payload: DocumentPayload,
    ) -> Result<LifecycleOutcome, LifecycleError> {
        match self {
            AppServices::InMemory { coordinator, .. } => {
                coordinator.create(tenant_id, document_type, payload).await
            }
            AppServices::Persistent { coordinator, .. } => {
                coordinator.create(tenant_id, document_type, payload).await
            }
        }
    }

    pub async fn update_document(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
        payload: DocumentPayload,
    ) -> Result<LifecycleOutcome, LifecycleError> {
        match self {
            AppServices::InMemory { coordinator, .. } => {
                coordinator.update(tenant_id, document_id, payload).await
            }
            AppServices::Persistent { coordinator, .. } => {
                coordinator.update(tenant_id, document_id, payload).await
            }
        }
    }

    pub async fn delete_document(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> Result<DeleteOutcome, LifecycleError> {
        match self {
            AppServices::InMemory { coordinator, .. } => {
                coordinator.delete(tenant_id, document_id).await
            }
            AppServices::Persistent { coordinator, .. } => {
                coordinator.delete(tenant_id, document_id).await
            }
        }
    }

    pub async fn fetch_document(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> Result<Document, LifecycleError> {
        match self {
            AppServices::InMemory { coordinator, .. } => {
                coordinator.fetch(tenant_id, document_id).await
            }
            AppServices::Persistent { coordinator, .. } => {
                coordinator.fetch(tenant_id, document_id).await
            }
        }
    }

    pub async fn peek_next_number(
        &self,
        tenant_id: TenantId,
        document_type: DocumentType,
    ) -> Result<NumberPreview, LifecycleError> {
        match self {
            AppServices::InMemory { coordinator, .. } => {
                coordinator.peek_next_number(tenant_id, document_type).await
            }
            AppServices::Persistent { coordinator, .. } => {
                coordinator.peek_next_number(tenant_id, document_type).await
            }
        }
    }

    /// Seed the in-memory party directory (dev wiring).
    pub fn register_party(&self, tenant_id: TenantId, snapshot: PartySnapshot) {
        match self {
            AppServices::InMemory { parties, .. } => parties.register(tenant_id, snapshot),
            AppServices::Persistent { parties, .. } => parties.register(tenant_id, snapshot),
        }
    }

    /// Seed the in-memory product catalog (dev wiring).
    pub fn register_product(&self, tenant_id: TenantId, name: String, product_id: ProductId) {
        match self {
            AppServices::InMemory { catalog, .. } => {
                catalog.register(tenant_id, name, product_id)
            }
            AppServices::Persistent { catalog, .. } => {
                catalog.register(tenant_id, name, product_id)
            }
        }
    }
}
