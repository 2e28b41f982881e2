use serde::{Deserialize, Serialize};

use billbook_core::AggregateId;

/// Product identifier (tenant-scoped via `tenant_id` fields on lookups).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// How a line item points at a product.
///
/// Imported documents and hand-keyed entries often carry only a product name;
/// the catalog resolves those to a canonical id once, at the start of
/// reconciliation. A reference that resolves to nothing is skipped for stock
/// purposes — not every line item maps to tracked inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductRef {
    ById(ProductId),
    ByName(String),
}

impl ProductRef {
    pub fn by_id(id: ProductId) -> Self {
        Self::ById(id)
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self::ByName(name.into())
    }

    /// The canonical id, when the reference already carries one.
    pub fn id(&self) -> Option<ProductId> {
        match self {
            Self::ById(id) => Some(*id),
            Self::ByName(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn by_id_exposes_the_id() {
        let id = ProductId::new(AggregateId::new());
        assert_eq!(ProductRef::by_id(id).id(), Some(id));
    }

    #[test]
    fn by_name_has_no_id() {
        assert_eq!(ProductRef::by_name("Widget").id(), None);
    }
}
