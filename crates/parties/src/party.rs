use serde::{Deserialize, Serialize};

use billbook_core::AggregateId;

/// Party identifier (tenant-scoped via `tenant_id` fields on lookups).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartyId(pub AggregateId);

impl PartyId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PartyId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Party kind: customer or supplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyKind {
    Customer,
    Supplier,
}

/// Denormalized party data attached to a document at write time.
///
/// This is the read-only enrichment shape returned by the party directory.
/// Balance bookkeeping happens elsewhere; the engine only carries the value
/// through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartySnapshot {
    pub party_id: PartyId,
    pub kind: PartyKind,
    pub name: String,
    pub address: Option<String>,
    /// Outstanding balance in minor units, as tracked by the party ledger.
    pub balance: i64,
}

impl PartySnapshot {
    pub fn new(party_id: PartyId, kind: PartyKind, name: impl Into<String>) -> Self {
        Self {
            party_id,
            kind,
            name: name.into(),
            address: None,
            balance: 0,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }
}
