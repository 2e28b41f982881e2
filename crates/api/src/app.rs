//! Application wiring: services + router.

use std::sync::Arc;

use axum::{Extension, Router, middleware::from_fn};

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full application router with its services attached.
pub async fn build_app() -> Router {
    let services = Arc::new(services::build_services().await);
    build_router(services)
}

pub fn build_router(services: Arc<AppServices>) -> Router {
    Router::new()
        .nest("/documents", routes::documents::router())
        .nest("/parties", routes::directory::parties_router())
        .nest("/products", routes::directory::products_router())
        .layer(from_fn(crate::middleware::tenant_middleware))
        .layer(Extension(services))
}
