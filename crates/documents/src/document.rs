use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use billbook_core::{AggregateId, DomainError, DomainResult, TenantId};
use billbook_parties::PartyId;
use billbook_products::ProductRef;

use crate::numbering::format_number;

/// Document identifier (tenant-scoped via `tenant_id` fields on the record).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub AggregateId);

impl DocumentId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Stock-affecting document streams.
///
/// Each type owns a numbering prefix and a stock direction. Returns carry the
/// inverse direction of their parent type; deletion reverses whichever
/// direction applied at write time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Purchase,
    PurchaseReturn,
    Sale,
    SaleReturn,
}

impl DocumentType {
    /// Numbering stream prefix, also the display-number prefix.
    pub fn prefix(self) -> &'static str {
        match self {
            DocumentType::Purchase => "PUR",
            DocumentType::PurchaseReturn => "PR",
            DocumentType::Sale => "INV",
            DocumentType::SaleReturn => "SR",
        }
    }

    /// Sign applied to line quantities when this document is written.
    ///
    /// Purchases and sale returns bring goods in; sales and purchase returns
    /// take goods out. Soft delete applies the negation.
    pub fn stock_direction(self) -> i64 {
        match self {
            DocumentType::Purchase | DocumentType::SaleReturn => 1,
            DocumentType::PurchaseReturn | DocumentType::Sale => -1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Purchase => "purchase",
            DocumentType::PurchaseReturn => "purchase_return",
            DocumentType::Sale => "sale",
            DocumentType::SaleReturn => "sale_return",
        }
    }
}

impl core::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for DocumentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(DocumentType::Purchase),
            "purchase_return" => Ok(DocumentType::PurchaseReturn),
            "sale" => Ok(DocumentType::Sale),
            "sale_return" => Ok(DocumentType::SaleReturn),
            other => Err(DomainError::validation(format!(
                "unknown document type: {other}"
            ))),
        }
    }
}

/// One document line.
///
/// `unit_rate` is in minor currency units and `tax_rate_bps` in basis points;
/// both are carried through untouched — the engine does no price or tax math.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product: ProductRef,
    pub quantity: i64,
    pub unit_rate: i64,
    #[serde(default)]
    pub tax_rate_bps: u32,
}

impl LineItem {
    pub fn new(product: ProductRef, quantity: i64, unit_rate: i64) -> Self {
        Self {
            product,
            quantity,
            unit_rate,
            tax_rate_bps: 0,
        }
    }
}

/// Incoming document mutation payload (create or update).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPayload {
    pub party_id: PartyId,
    pub line_items: Vec<LineItem>,
    /// Clients sometimes echo the whole document back on update. The number
    /// is immutable after creation; any attempt to change it is rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_number: Option<u64>,
}

impl DocumentPayload {
    pub fn new(party_id: PartyId, line_items: Vec<LineItem>) -> Self {
        Self {
            party_id,
            line_items,
            assigned_number: None,
        }
    }

    /// Reject malformed line items before any write happens.
    pub fn validate(&self) -> DomainResult<()> {
        for (idx, line) in self.line_items.iter().enumerate() {
            if line.quantity <= 0 {
                return Err(DomainError::validation(format!(
                    "line {idx}: quantity must be positive"
                )));
            }
            if let ProductRef::ByName(name) = &line.product {
                if name.trim().is_empty() {
                    return Err(DomainError::validation(format!(
                        "line {idx}: product name cannot be empty"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A persisted stock-affecting document.
///
/// `assigned_number` is set exactly once, at creation, and survives soft
/// deletion — numbers are never reused or compacted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub tenant_id: TenantId,
    pub document_id: DocumentId,
    pub document_type: DocumentType,
    pub assigned_number: u64,
    pub formatted_number: String,
    pub party_id: PartyId,
    pub party_name: String,
    pub line_items: Vec<LineItem>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Assemble a freshly numbered document. The caller owns allocation.
    #[allow(clippy::too_many_arguments)]
    pub fn create(
        tenant_id: TenantId,
        document_id: DocumentId,
        document_type: DocumentType,
        assigned_number: u64,
        party_id: PartyId,
        party_name: impl Into<String>,
        line_items: Vec<LineItem>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_id,
            document_id,
            document_type,
            assigned_number,
            formatted_number: format_number(document_type.prefix(), assigned_number),
            party_id,
            party_name: party_name.into(),
            line_items,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Replace the mutable fields from an update payload.
    ///
    /// Line items are replaced wholesale; the assigned number never changes.
    pub fn apply_update(
        &mut self,
        party_id: PartyId,
        party_name: impl Into<String>,
        line_items: Vec<LineItem>,
        now: DateTime<Utc>,
    ) {
        self.party_id = party_id;
        self.party_name = party_name.into();
        self.line_items = line_items;
        self.updated_at = now;
    }

    /// Flip the soft-delete flag. One-way: there is no resurrection.
    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.is_deleted = true;
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use billbook_products::ProductId;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_document_id() -> DocumentId {
        DocumentId::new(AggregateId::new())
    }

    fn test_party_id() -> PartyId {
        PartyId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn create_formats_the_assigned_number() {
        let doc = Document::create(
            test_tenant_id(),
            test_document_id(),
            DocumentType::Purchase,
            42,
            test_party_id(),
            "Acme Traders",
            vec![],
            test_time(),
        );

        assert_eq!(doc.assigned_number, 42);
        assert_eq!(doc.formatted_number, "PUR-00042");
        assert!(doc.is_active());
    }

    #[test]
    fn mark_deleted_is_one_way() {
        let mut doc = Document::create(
            test_tenant_id(),
            test_document_id(),
            DocumentType::PurchaseReturn,
            1,
            test_party_id(),
            "Acme Traders",
            vec![],
            test_time(),
        );

        doc.mark_deleted(test_time());
        assert!(!doc.is_active());
        assert_eq!(doc.formatted_number, "PR-00001");
    }

    #[test]
    fn payload_rejects_non_positive_quantity() {
        let payload = DocumentPayload::new(
            test_party_id(),
            vec![LineItem::new(
                ProductRef::by_id(ProductId::new(AggregateId::new())),
                0,
                500,
            )],
        );

        let err = payload.validate().unwrap_err();
        match err {
            DomainError::Validation(msg) => assert!(msg.contains("quantity must be positive")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn payload_rejects_blank_product_name() {
        let payload = DocumentPayload::new(
            test_party_id(),
            vec![LineItem::new(ProductRef::by_name("   "), 3, 500)],
        );

        assert!(payload.validate().is_err());
    }

    #[test]
    fn stock_direction_inverts_for_returns() {
        assert_eq!(DocumentType::Purchase.stock_direction(), 1);
        assert_eq!(DocumentType::PurchaseReturn.stock_direction(), -1);
        assert_eq!(DocumentType::Sale.stock_direction(), -1);
        assert_eq!(DocumentType::SaleReturn.stock_direction(), 1);
    }

    #[test]
    fn document_type_round_trips_through_str() {
        for ty in [
            DocumentType::Purchase,
            DocumentType::PurchaseReturn,
            DocumentType::Sale,
            DocumentType::SaleReturn,
        ] {
            assert_eq!(ty.as_str().parse::<DocumentType>().unwrap(), ty);
        }
        assert!("credit_note".parse::<DocumentType>().is_err());
    }
}
