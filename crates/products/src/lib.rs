//! Product domain module.
//!
//! Line items reference products either by id or by name. This crate holds the
//! product reference types the document engine resolves against the catalog.

pub mod product;

pub use product::{ProductId, ProductRef};
