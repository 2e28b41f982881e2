//! Document domain module.
//!
//! This crate contains the business rules of the numbering and stock engine,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage): document/line-item shapes, the soft-delete lifecycle, display
//! number formatting, and the per-product delta computation.

pub mod delta;
pub mod document;
pub mod numbering;

pub use delta::{DeltaMap, aggregate_quantities, signed_deltas};
pub use document::{Document, DocumentId, DocumentPayload, DocumentType, LineItem};
pub use numbering::format_number;
