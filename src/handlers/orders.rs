use crate::{
    entities::{TransactionStatus, VerificationStatus},
    errors::ServiceError,
    handlers::common::{created_response, success_response, PaginationMeta, PaginationParams},
    services::OwnerKey,
    AppState,
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
    routing::{get, post, put},
    Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Admin back-office order endpoints: listing, lookup, the payment
/// verification workflow, proof uploads and payment recording.
pub fn orders_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/number/:number", get(get_order_by_number))
        .route("/owner/:owner", get(list_orders_for_owner))
        .route("/:id/verification", put(set_verification))
        .route("/:id/payment-proof", post(attach_payment_proof))
        .route("/:id/payments", post(record_payment))
        .route("/:id/transactions", get(list_transactions))
        .route("/:id/invoice", get(get_order_invoice))
        .route("/transactions/:txn_id/status", put(update_transaction_status))
}

#[derive(Debug, Serialize)]
struct OrderListResponse<T: Serialize> {
    data: Vec<T>,
    meta: PaginationMeta,
}

#[derive(Debug, Deserialize)]
struct VerificationRequest {
    status: String,
    notes: Option<String>,
    admin: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PaymentProofRequest {
    urls: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RecordPaymentRequest {
    amount: Decimal,
    #[serde(default = "default_currency")]
    currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let (orders, total) = state
        .services
        .orders
        .list_orders(params.page, params.per_page)
        .await?;
    Ok(success_response(OrderListResponse {
        meta: PaginationMeta::new(&params, total),
        data: orders,
    }))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.get_order(id).await?;
    Ok(success_response(order))
}

async fn get_order_by_number(
    State(state): State<Arc<AppState>>,
    Path(number): Path<i64>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.services.orders.get_order_by_number(number).await?;
    Ok(success_response(order))
}

/// Storefront order history for one customer or guest.
async fn list_orders_for_owner(
    State(state): State<Arc<AppState>>,
    Path(owner): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let owner = OwnerKey::parse(&owner)?;
    let orders = state
        .services
        .orders
        .list_orders_for_owner(&owner.encode())
        .await?;
    Ok(success_response(json!({ "data": orders })))
}

async fn set_verification(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<VerificationRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let status = parse_verification_status(&payload.status)?;
    let order = state
        .services
        .orders
        .set_verification(id, status, payload.notes, payload.admin)
        .await?;
    Ok(success_response(order))
}

async fn attach_payment_proof(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<PaymentProofRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state
        .services
        .orders
        .attach_payment_proof(id, payload.urls)
        .await?;
    Ok(success_response(order))
}

async fn record_payment(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordPaymentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let record = state
        .services
        .payments
        .record_payment(id, payload.amount, payload.currency)
        .await?;
    Ok(created_response(record))
}

async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let records = state.services.payments.transactions_for_order(id).await?;
    Ok(success_response(json!({ "data": records })))
}

#[derive(Debug, Deserialize)]
struct TransactionStatusRequest {
    status: String,
}

async fn update_transaction_status(
    State(state): State<Arc<AppState>>,
    Path(txn_id): Path<Uuid>,
    Json(payload): Json<TransactionStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let status = parse_transaction_status(&payload.status)?;
    let record = state.services.payments.update_status(txn_id, status).await?;
    Ok(success_response(record))
}

async fn get_order_invoice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let invoice = state.services.invoicing.invoice_for_order(id).await?;
    Ok(success_response(invoice))
}

fn parse_verification_status(s: &str) -> Result<VerificationStatus, ServiceError> {
    match s {
        "pending" => Ok(VerificationStatus::Pending),
        "approved" => Ok(VerificationStatus::Approved),
        "rejected" => Ok(VerificationStatus::Rejected),
        other => Err(ServiceError::ValidationError(format!(
            "Invalid verification status: {} (expected pending, approved or rejected)",
            other
        ))),
    }
}

fn parse_transaction_status(s: &str) -> Result<TransactionStatus, ServiceError> {
    match s {
        "recorded" => Ok(TransactionStatus::Recorded),
        "settled" => Ok(TransactionStatus::Settled),
        "voided" => Ok(TransactionStatus::Voided),
        other => Err(ServiceError::ValidationError(format!(
            "Invalid transaction status: {}",
            other
        ))),
    }
}
