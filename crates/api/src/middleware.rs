use axum::{
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};

use billbook_core::TenantId;

use crate::context::TenantContext;

/// Resolve the tenant for a request from the `x-tenant-id` header.
///
/// Authentication proper lives in front of this service; by the time a
/// request lands here the tenant header is trusted.
pub async fn tenant_middleware(
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let tenant_id = extract_tenant(req.headers())?;

    req.extensions_mut().insert(TenantContext::new(tenant_id));

    Ok(next.run(req).await)
}

fn extract_tenant(headers: &HeaderMap) -> Result<TenantId, StatusCode> {
    let header = headers
        .get("x-tenant-id")
        .ok_or(StatusCode::BAD_REQUEST)?;

    let header = header.to_str().map_err(|_| StatusCode::BAD_REQUEST)?;

    header.trim().parse().map_err(|_| StatusCode::BAD_REQUEST)
}
