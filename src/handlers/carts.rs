use crate::{
    errors::ServiceError,
    handlers::common::{no_content_response, success_response},
    services::cart::OwnerKey,
    AppState,
};
use axum::{
    extract::{Json, Path, State},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

/// Cart endpoints, keyed by the encoded owner key
/// (`customer:<uuid>` or `guest:<id>`).
pub fn carts_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:owner", get(get_cart))
        .route("/:owner/items", post(add_item))
        .route("/:owner/items/:item_id", put(update_item_quantity))
        .route("/:owner/items/:item_id", delete(remove_item))
        .route("/:owner/clear", post(clear_cart))
}

#[derive(Debug, Deserialize)]
struct AddItemRequest {
    product_id: Uuid,
    #[serde(default = "default_quantity")]
    quantity: i32,
}

fn default_quantity() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
struct UpdateQuantityRequest {
    quantity: i32,
}

async fn get_cart(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let owner = OwnerKey::parse(&owner)?;
    let view = state.services.cart.get_cart(&owner).await?;
    Ok(success_response(view))
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
    Json(payload): Json<AddItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let owner = OwnerKey::parse(&owner)?;
    let view = state
        .services
        .cart
        .add_item(&owner, payload.product_id, payload.quantity)
        .await?;
    Ok(success_response(view))
}

async fn update_item_quantity(
    State(state): State<Arc<AppState>>,
    Path((owner, item_id)): Path<(String, Uuid)>,
    Json(payload): Json<UpdateQuantityRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let owner = OwnerKey::parse(&owner)?;
    let view = state
        .services
        .cart
        .update_quantity(&owner, item_id, payload.quantity)
        .await?;
    Ok(success_response(view))
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    Path((owner, item_id)): Path<(String, Uuid)>,
) -> Result<impl IntoResponse, ServiceError> {
    let owner = OwnerKey::parse(&owner)?;
    let view = state.services.cart.remove_item(&owner, item_id).await?;
    Ok(success_response(view))
}

async fn clear_cart(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let owner = OwnerKey::parse(&owner)?;
    state.services.cart.clear(&owner).await?;
    Ok(no_content_response())
}
