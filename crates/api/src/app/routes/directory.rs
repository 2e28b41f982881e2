//! Dev seeding routes for the in-memory party directory and product catalog.
//!
//! Production deployments point the engine at the services that own party and
//! product data; these endpoints keep a standalone instance usable.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};

use billbook_core::AggregateId;
use billbook_parties::{PartyId, PartyKind, PartySnapshot};
use billbook_products::ProductId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn parties_router() -> Router {
    Router::new().route("/", post(register_party))
}

pub fn products_router() -> Router {
    Router::new().route("/", post(register_product))
}

pub async fn register_party(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Json(body): Json<dto::RegisterPartyRequest>,
) -> axum::response::Response {
    let kind = match body.kind.as_str() {
        "customer" => PartyKind::Customer,
        "supplier" => PartyKind::Supplier,
        _ => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_party_kind",
                "kind must be one of: customer, supplier",
            );
        }
    };

    let agg: AggregateId = match body.party_id {
        Some(ref id) => match id.parse() {
            Ok(v) => v,
            Err(_) => {
                return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid party_id");
            }
        },
        None => AggregateId::new(),
    };

    let mut snapshot = PartySnapshot::new(PartyId::new(agg), kind, body.name);
    if let Some(address) = body.address {
        snapshot = snapshot.with_address(address);
    }
    services.register_party(tenant.tenant_id(), snapshot);

    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": agg.to_string() })),
    )
        .into_response()
}

pub async fn register_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Json(body): Json<dto::RegisterProductRequest>,
) -> axum::response::Response {
    let agg: AggregateId = match body.product_id {
        Some(ref id) => match id.parse() {
            Ok(v) => v,
            Err(_) => {
                return errors::json_error(
                    StatusCode::BAD_REQUEST,
                    "invalid_id",
                    "invalid product_id",
                );
            }
        },
        None => AggregateId::new(),
    };

    services.register_product(tenant.tenant_id(), body.name, ProductId::new(agg));

    (
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": agg.to_string() })),
    )
        .into_response()
}
