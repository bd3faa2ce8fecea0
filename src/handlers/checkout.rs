use crate::{
    errors::ServiceError,
    handlers::common::created_response,
    services::{cart::OwnerKey, checkout::BillingInfo},
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::post,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn checkout_routes() -> Router<Arc<AppState>> {
    Router::new().route("/:owner", post(place_order))
}

#[derive(Debug, Deserialize)]
struct PlaceOrderRequest {
    billing: BillingInfo,
    payment_method: String,
}

/// Convert the owner's cart into an order and invoice. On failure the cart
/// is left untouched so the customer can retry.
async fn place_order(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
    Json(payload): Json<PlaceOrderRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let owner = OwnerKey::parse(&owner)?;
    let confirmation = state
        .services
        .checkout
        .place_order(&owner, payload.billing, payload.payment_method)
        .await?;
    Ok(created_response(confirmation))
}
