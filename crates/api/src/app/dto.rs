use serde::Deserialize;
use serde_json::json;

use billbook_core::AggregateId;
use billbook_documents::{Document, DocumentPayload, LineItem};
use billbook_infra::StockApplyReport;
use billbook_parties::PartyId;
use billbook_products::{ProductId, ProductRef};

#[derive(Debug, Deserialize)]
pub struct LineItemRequest {
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub quantity: i64,
    pub unit_rate: i64,
    #[serde(default)]
    pub tax_rate_bps: u32,
}

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub document_type: String,
    pub party_id: String,
    #[serde(default)]
    pub line_items: Vec<LineItemRequest>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDocumentRequest {
    pub party_id: String,
    #[serde(default)]
    pub line_items: Vec<LineItemRequest>,
    pub assigned_number: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterPartyRequest {
    pub party_id: Option<String>,
    pub kind: String,
    pub name: String,
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterProductRequest {
    pub product_id: Option<String>,
    pub name: String,
}

fn line_item_from_request(idx: usize, req: &LineItemRequest) -> Result<LineItem, String> {
    let product = match (&req.product_id, &req.product_name) {
        (Some(id), _) => {
            let id: AggregateId = id
                .parse()
                .map_err(|_| format!("line {idx}: invalid product_id"))?;
            ProductRef::by_id(ProductId::new(id))
        }
        (None, Some(name)) => ProductRef::by_name(name.clone()),
        (None, None) => {
            return Err(format!("line {idx}: product_id or product_name required"));
        }
    };

    Ok(LineItem {
        product,
        quantity: req.quantity,
        unit_rate: req.unit_rate,
        tax_rate_bps: req.tax_rate_bps,
    })
}

pub fn payload_from_parts(
    party_id: &str,
    line_items: &[LineItemRequest],
    assigned_number: Option<u64>,
) -> Result<DocumentPayload, String> {
    let party: AggregateId = party_id.parse().map_err(|_| "invalid party_id".to_string())?;

    let line_items = line_items
        .iter()
        .enumerate()
        .map(|(idx, req)| line_item_from_request(idx, req))
        .collect::<Result<Vec<_>, _>>()?;

    let mut payload = DocumentPayload::new(PartyId::new(party), line_items);
    payload.assigned_number = assigned_number;
    Ok(payload)
}

pub fn document_to_json(document: &Document) -> serde_json::Value {
    json!({
        "id": document.document_id.to_string(),
        "document_type": document.document_type.as_str(),
        "assigned_number": document.assigned_number,
        "formatted_number": document.formatted_number,
        "party_id": document.party_id.to_string(),
        "party_name": document.party_name,
        "line_items": serde_json::to_value(&document.line_items).unwrap_or_default(),
        "is_deleted": document.is_deleted,
        "created_at": document.created_at,
        "updated_at": document.updated_at,
    })
}

fn stock_levels_to_json<'a, V: serde::Serialize>(
    entries: impl Iterator<Item = (&'a ProductId, V)>,
) -> serde_json::Value {
    serde_json::Value::Object(
        entries
            .map(|(product, value)| {
                (
                    product.to_string(),
                    serde_json::to_value(value).unwrap_or_default(),
                )
            })
            .collect(),
    )
}

pub fn stock_report_to_json(report: &StockApplyReport) -> serde_json::Value {
    json!({
        "complete": report.is_complete(),
        "applied": stock_levels_to_json(report.applied.iter()),
        "failed": stock_levels_to_json(report.failed.iter()),
    })
}
