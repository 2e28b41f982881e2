use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    routing::post,
};

use billbook_core::AggregateId;
use billbook_documents::{DocumentId, DocumentType};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_document))
        .route("/next-number/:doc_type", get(peek_next_number))
        .route(
            "/:id",
            get(get_document).put(update_document).delete(delete_document),
        )
}

pub async fn create_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Json(body): Json<dto::CreateDocumentRequest>,
) -> axum::response::Response {
    let document_type: DocumentType = match body.document_type.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_document_type",
                format!("unknown document type: {}", body.document_type),
            );
        }
    };

    let payload = match dto::payload_from_parts(&body.party_id, &body.line_items, None) {
        Ok(p) => p,
        Err(msg) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_input", msg),
    };

    let outcome = match services
        .create_document(tenant.tenant_id(), document_type, payload)
        .await
    {
        Ok(o) => o,
        Err(e) => return errors::lifecycle_error_to_response(e),
    };

    (
        StatusCode::CREATED,
        Json(serde_json::json!({
            "document": dto::document_to_json(&outcome.document),
            "stock": dto::stock_report_to_json(&outcome.stock),
        })),
    )
        .into_response()
}

pub async fn update_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateDocumentRequest>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid document id");
        }
    };

    let payload =
        match dto::payload_from_parts(&body.party_id, &body.line_items, body.assigned_number) {
            Ok(p) => p,
            Err(msg) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_input", msg),
        };

    let outcome = match services
        .update_document(tenant.tenant_id(), DocumentId::new(agg), payload)
        .await
    {
        Ok(o) => o,
        Err(e) => return errors::lifecycle_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "document": dto::document_to_json(&outcome.document),
            "stock": dto::stock_report_to_json(&outcome.stock),
        })),
    )
        .into_response()
}

pub async fn delete_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid document id");
        }
    };

    let outcome = match services
        .delete_document(tenant.tenant_id(), DocumentId::new(agg))
        .await
    {
        Ok(o) => o,
        Err(e) => return errors::lifecycle_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "deleted": outcome.deleted,
            "stock": dto::stock_report_to_json(&outcome.stock),
        })),
    )
        .into_response()
}

pub async fn get_document(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let agg: AggregateId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid document id");
        }
    };

    match services
        .fetch_document(tenant.tenant_id(), DocumentId::new(agg))
        .await
    {
        Ok(document) => (StatusCode::OK, Json(dto::document_to_json(&document))).into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}

pub async fn peek_next_number(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<crate::context::TenantContext>,
    Path(doc_type): Path<String>,
) -> axum::response::Response {
    let document_type: DocumentType = match doc_type.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "invalid_document_type",
                format!("unknown document type: {doc_type}"),
            );
        }
    };

    match services
        .peek_next_number(tenant.tenant_id(), document_type)
        .await
    {
        Ok(preview) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "seq": preview.seq,
                "formatted": preview.formatted,
            })),
        )
            .into_response(),
        Err(e) => errors::lifecycle_error_to_response(e),
    }
}
