//! Postgres-backed store implementations.
//!
//! This module provides persistent counter, stock and document storage using
//! PostgreSQL. Every shared-state mutation is a single SQL statement, so the
//! atomicity contract of the store traits falls out of the database's
//! row-level atomicity — no application-level locks.
//!
//! ## Schema
//!
//! ```sql
//! CREATE TABLE counters (
//!     tenant_id  UUID        NOT NULL,
//!     prefix     TEXT        NOT NULL,
//!     seq        BIGINT      NOT NULL DEFAULT 0 CHECK (seq >= 0),
//!     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! CREATE UNIQUE INDEX counters_tenant_prefix_key ON counters (tenant_id, prefix);
//!
//! CREATE TABLE stock_levels (
//!     tenant_id     UUID        NOT NULL,
//!     product_id    UUID        NOT NULL,
//!     current_stock BIGINT      NOT NULL DEFAULT 0,
//!     updated_at    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     PRIMARY KEY (tenant_id, product_id)
//! );
//!
//! CREATE TABLE documents (
//!     tenant_id        UUID        NOT NULL,
//!     document_id      UUID        NOT NULL,
//!     document_type    TEXT        NOT NULL,
//!     assigned_number  BIGINT      NOT NULL,
//!     formatted_number TEXT        NOT NULL,
//!     party_id         UUID        NOT NULL,
//!     party_name       TEXT        NOT NULL,
//!     line_items       JSONB       NOT NULL,
//!     is_deleted       BOOLEAN     NOT NULL DEFAULT FALSE,
//!     created_at       TIMESTAMPTZ NOT NULL,
//!     updated_at       TIMESTAMPTZ NOT NULL,
//!     PRIMARY KEY (tenant_id, document_id)
//! );
//! ```
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | Mapped To | Scenario |
//! |------------|----------------------|-----------|----------|
//! | Database (unique violation) | `23505` on counters | `LegacyIndexConflict` | A stale single-field unique index on `prefix` rejected the upsert |
//! | Database (unique violation) | `23505` on documents | `Duplicate` | Insert collided with an existing `(tenant_id, document_id)` |
//! | Database (other) | Any other | `Backend` | Other database errors |
//! | PoolClosed / network / decode | N/A | `Backend` | Connection failures, row decode failures |
//!
//! ## Thread Safety
//!
//! All stores are `Send + Sync` and can be shared across threads. Operations
//! go through the SQLx connection pool, which handles thread-safe connection
//! management.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use tracing::instrument;

use billbook_core::{AggregateId, TenantId};
use billbook_documents::{Document, DocumentId, DocumentType, LineItem};
use billbook_parties::PartyId;
use billbook_products::ProductId;

use super::r#trait::{
    DocumentStore, DocumentStoreError, SequenceStore, SequenceStoreError, StockStore,
    StockStoreError,
};

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}

fn backend_message(operation: &str, err: &sqlx::Error) -> String {
    format!("sqlx error in {operation}: {err}")
}

/// Postgres-backed counter records.
///
/// Allocation is one `INSERT .. ON CONFLICT .. DO UPDATE .. RETURNING`
/// statement — increment-or-create in a single atomic step. A unique
/// violation during that upsert can only come from an index *other* than the
/// compound key it targets, which is exactly the legacy-index signature the
/// allocator repairs.
#[derive(Debug, Clone)]
pub struct PostgresSequenceStore {
    pool: Arc<PgPool>,
}

impl PostgresSequenceStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl SequenceStore for PostgresSequenceStore {
    #[instrument(skip(self), fields(tenant_id = %tenant_id.as_uuid(), prefix), err)]
    async fn increment_and_fetch(
        &self,
        tenant_id: TenantId,
        prefix: &str,
    ) -> Result<u64, SequenceStoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO counters (tenant_id, prefix, seq)
            VALUES ($1, $2, 1)
            ON CONFLICT (tenant_id, prefix)
            DO UPDATE SET
                seq = counters.seq + 1,
                updated_at = NOW()
            RETURNING seq
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(prefix)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                SequenceStoreError::LegacyIndexConflict(format!(
                    "counter upsert for prefix '{prefix}' rejected: {e}"
                ))
            } else {
                SequenceStoreError::Backend(backend_message("increment_and_fetch", &e))
            }
        })?;

        let seq: i64 = row
            .try_get("seq")
            .map_err(|e| SequenceStoreError::Backend(format!("failed to read seq: {e}")))?;
        Ok(seq as u64)
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id.as_uuid(), prefix), err)]
    async fn peek(&self, tenant_id: TenantId, prefix: &str) -> Result<u64, SequenceStoreError> {
        let row = sqlx::query("SELECT seq FROM counters WHERE tenant_id = $1 AND prefix = $2")
            .bind(tenant_id.as_uuid())
            .bind(prefix)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| SequenceStoreError::Backend(backend_message("peek", &e)))?;

        match row {
            Some(row) => {
                let seq: i64 = row
                    .try_get("seq")
                    .map_err(|e| SequenceStoreError::Backend(format!("failed to read seq: {e}")))?;
                Ok(seq as u64 + 1)
            }
            None => Ok(1),
        }
    }

    #[instrument(skip(self), err)]
    async fn repair_key_index(&self) -> Result<(), SequenceStoreError> {
        // Stale schema left a unique index on prefix alone; the counter key is
        // (tenant_id, prefix).
        for statement in [
            "ALTER TABLE counters DROP CONSTRAINT IF EXISTS counters_prefix_key",
            "DROP INDEX IF EXISTS counters_prefix_key",
            "CREATE UNIQUE INDEX IF NOT EXISTS counters_tenant_prefix_key ON counters (tenant_id, prefix)",
        ] {
            sqlx::query(statement)
                .execute(&*self.pool)
                .await
                .map_err(|e| {
                    SequenceStoreError::Backend(backend_message("repair_key_index", &e))
                })?;
        }
        Ok(())
    }
}

/// Postgres-backed stock levels.
#[derive(Debug, Clone)]
pub struct PostgresStockStore {
    pool: Arc<PgPool>,
}

impl PostgresStockStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl StockStore for PostgresStockStore {
    #[instrument(
        skip(self),
        fields(tenant_id = %tenant_id.as_uuid(), product_id = %product_id, delta),
        err
    )]
    async fn adjust(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
        delta: i64,
    ) -> Result<i64, StockStoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO stock_levels (tenant_id, product_id, current_stock)
            VALUES ($1, $2, $3)
            ON CONFLICT (tenant_id, product_id)
            DO UPDATE SET
                current_stock = stock_levels.current_stock + EXCLUDED.current_stock,
                updated_at = NOW()
            RETURNING current_stock
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(product_id.0.as_uuid())
        .bind(delta)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| StockStoreError::Backend(backend_message("adjust", &e)))?;

        row.try_get("current_stock")
            .map_err(|e| StockStoreError::Backend(format!("failed to read current_stock: {e}")))
    }

    #[instrument(
        skip(self),
        fields(tenant_id = %tenant_id.as_uuid(), product_id = %product_id),
        err
    )]
    async fn current(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<i64, StockStoreError> {
        let row = sqlx::query(
            "SELECT current_stock FROM stock_levels WHERE tenant_id = $1 AND product_id = $2",
        )
        .bind(tenant_id.as_uuid())
        .bind(product_id.0.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| StockStoreError::Backend(backend_message("current", &e)))?;

        match row {
            Some(row) => row.try_get("current_stock").map_err(|e| {
                StockStoreError::Backend(format!("failed to read current_stock: {e}"))
            }),
            None => Ok(0),
        }
    }
}

/// Postgres-backed document records.
#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: Arc<PgPool>,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

fn document_from_row(row: &PgRow) -> Result<Document, DocumentStoreError> {
    let decode = |field: &str, e: sqlx::Error| {
        DocumentStoreError::Backend(format!("failed to read {field}: {e}"))
    };

    let tenant_id: uuid::Uuid = row.try_get("tenant_id").map_err(|e| decode("tenant_id", e))?;
    let document_id: uuid::Uuid = row
        .try_get("document_id")
        .map_err(|e| decode("document_id", e))?;
    let document_type: String = row
        .try_get("document_type")
        .map_err(|e| decode("document_type", e))?;
    let assigned_number: i64 = row
        .try_get("assigned_number")
        .map_err(|e| decode("assigned_number", e))?;
    let formatted_number: String = row
        .try_get("formatted_number")
        .map_err(|e| decode("formatted_number", e))?;
    let party_id: uuid::Uuid = row.try_get("party_id").map_err(|e| decode("party_id", e))?;
    let party_name: String = row
        .try_get("party_name")
        .map_err(|e| decode("party_name", e))?;
    let line_items: serde_json::Value = row
        .try_get("line_items")
        .map_err(|e| decode("line_items", e))?;
    let is_deleted: bool = row
        .try_get("is_deleted")
        .map_err(|e| decode("is_deleted", e))?;
    let created_at = row
        .try_get("created_at")
        .map_err(|e| decode("created_at", e))?;
    let updated_at = row
        .try_get("updated_at")
        .map_err(|e| decode("updated_at", e))?;

    let document_type: DocumentType = document_type
        .parse()
        .map_err(|e| DocumentStoreError::Backend(format!("stored document_type invalid: {e}")))?;
    let line_items: Vec<LineItem> = serde_json::from_value(line_items)
        .map_err(|e| DocumentStoreError::Backend(format!("stored line_items invalid: {e}")))?;

    Ok(Document {
        tenant_id: TenantId::from_uuid(tenant_id),
        document_id: DocumentId::new(AggregateId::from_uuid(document_id)),
        document_type,
        assigned_number: assigned_number as u64,
        formatted_number,
        party_id: PartyId::new(AggregateId::from_uuid(party_id)),
        party_name,
        line_items,
        is_deleted,
        created_at,
        updated_at,
    })
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    #[instrument(
        skip(self, document),
        fields(
            tenant_id = %document.tenant_id.as_uuid(),
            document_id = %document.document_id,
            document_type = %document.document_type
        ),
        err
    )]
    async fn insert(&self, document: &Document) -> Result<(), DocumentStoreError> {
        let line_items = serde_json::to_value(&document.line_items).map_err(|e| {
            DocumentStoreError::Backend(format!("line_items serialization failed: {e}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO documents (
                tenant_id,
                document_id,
                document_type,
                assigned_number,
                formatted_number,
                party_id,
                party_name,
                line_items,
                is_deleted,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(document.tenant_id.as_uuid())
        .bind(document.document_id.0.as_uuid())
        .bind(document.document_type.as_str())
        .bind(document.assigned_number as i64)
        .bind(&document.formatted_number)
        .bind(document.party_id.0.as_uuid())
        .bind(&document.party_name)
        .bind(&line_items)
        .bind(document.is_deleted)
        .bind(document.created_at)
        .bind(document.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DocumentStoreError::Duplicate(document.document_id.to_string())
            } else {
                DocumentStoreError::Backend(backend_message("insert", &e))
            }
        })?;

        Ok(())
    }

    #[instrument(
        skip(self),
        fields(tenant_id = %tenant_id.as_uuid(), document_id = %document_id),
        err
    )]
    async fn fetch(
        &self,
        tenant_id: TenantId,
        document_id: DocumentId,
    ) -> Result<Option<Document>, DocumentStoreError> {
        let row = sqlx::query(
            r#"
            SELECT
                tenant_id,
                document_id,
                document_type,
                assigned_number,
                formatted_number,
                party_id,
                party_name,
                line_items,
                is_deleted,
                created_at,
                updated_at
            FROM documents
            WHERE tenant_id = $1 AND document_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(document_id.0.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| DocumentStoreError::Backend(backend_message("fetch", &e)))?;

        row.as_ref().map(document_from_row).transpose()
    }

    #[instrument(
        skip(self, document),
        fields(
            tenant_id = %document.tenant_id.as_uuid(),
            document_id = %document.document_id
        ),
        err
    )]
    async fn persist(&self, document: &Document) -> Result<(), DocumentStoreError> {
        let line_items = serde_json::to_value(&document.line_items).map_err(|e| {
            DocumentStoreError::Backend(format!("line_items serialization failed: {e}"))
        })?;

        let result = sqlx::query(
            r#"
            UPDATE documents SET
                party_id = $3,
                party_name = $4,
                line_items = $5,
                is_deleted = $6,
                updated_at = $7
            WHERE tenant_id = $1 AND document_id = $2
            "#,
        )
        .bind(document.tenant_id.as_uuid())
        .bind(document.document_id.0.as_uuid())
        .bind(document.party_id.0.as_uuid())
        .bind(&document.party_name)
        .bind(&line_items)
        .bind(document.is_deleted)
        .bind(document.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| DocumentStoreError::Backend(backend_message("persist", &e)))?;

        if result.rows_affected() == 0 {
            return Err(DocumentStoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id.as_uuid()), err)]
    async fn list(&self, tenant_id: TenantId) -> Result<Vec<Document>, DocumentStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT
                tenant_id,
                document_id,
                document_type,
                assigned_number,
                formatted_number,
                party_id,
                party_name,
                line_items,
                is_deleted,
                created_at,
                updated_at
            FROM documents
            WHERE tenant_id = $1
            ORDER BY assigned_number ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| DocumentStoreError::Backend(backend_message("list", &e)))?;

        rows.iter().map(document_from_row).collect()
    }
}
