//! Party domain module.
//!
//! Documents reference a party (customer or supplier). This crate holds the
//! party-side types consumed by the document engine; the directory lookup
//! itself is an infrastructure concern (see `billbook-infra`).

pub mod party;

pub use party::{PartyId, PartyKind, PartySnapshot};
