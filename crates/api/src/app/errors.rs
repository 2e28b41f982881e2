use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use billbook_infra::LifecycleError;

pub fn lifecycle_error_to_response(err: LifecycleError) -> axum::response::Response {
    match err {
        LifecycleError::Input(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_input", msg),
        LifecycleError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        LifecycleError::NumberAllocation(e) => {
            json_error(StatusCode::CONFLICT, "allocation_conflict", e.to_string())
        }
        LifecycleError::PartyResolution(e) => {
            json_error(StatusCode::BAD_GATEWAY, "party_directory_error", e.to_string())
        }
        LifecycleError::Reconciliation(e) => {
            json_error(StatusCode::BAD_GATEWAY, "catalog_error", e.to_string())
        }
        LifecycleError::Persistence(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            e.to_string(),
        ),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
