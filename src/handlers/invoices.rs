use crate::{errors::ServiceError, handlers::common::success_response, AppState};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub fn invoices_routes() -> Router<Arc<AppState>> {
    Router::new().route("/:id", get(get_invoice))
}

async fn get_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state.services.invoicing.get_invoice(id).await?;
    let lines = state.services.invoicing.lines(&invoice)?;
    Ok(success_response(json!({
        "invoice": invoice,
        "lines": lines,
    })))
}
