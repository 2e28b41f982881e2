//! Store boundaries for counters, stock levels and documents.
//!
//! This module defines infrastructure-facing abstractions for the three
//! shared-state collections without making any storage assumptions. The
//! in-memory implementations back dev/test wiring; the Postgres ones back
//! production.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryDocumentStore, InMemorySequenceStore, InMemoryStockStore};
pub use postgres::{PostgresDocumentStore, PostgresSequenceStore, PostgresStockStore};
pub use r#trait::{
    DocumentStore, DocumentStoreError, SequenceStore, SequenceStoreError, StockStore,
    StockStoreError,
};
