use crate::{errors::ServiceError, handlers::common::success_response, AppState};
use axum::{extract::State, response::IntoResponse, routing::get, routing::post, Router};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Storefront product listing plus the admin sync controls for the
/// upstream catalog mirror.
pub fn products_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_products))
        .route("/sync", post(trigger_sync))
        .route("/sync/cancel", post(cancel_sync))
}

async fn list_products(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServiceError> {
    let products = state.services.catalog.list_products().await?;
    Ok(success_response(json!({ "data": products })))
}

/// Run a full mirror sync and return its report once it finishes.
async fn trigger_sync(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServiceError> {
    info!("catalog sync requested");
    let report = state.services.catalog.sync_catalog().await?;
    Ok(success_response(report))
}

async fn cancel_sync(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ServiceError> {
    state.services.catalog.request_cancel();
    Ok(success_response(json!({ "cancelling": true })))
}
