use std::sync::Arc;

use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    entities::{invoice, Invoice as InvoiceEntity, InvoiceModel},
    errors::ServiceError,
};

/// One line of an invoice's denormalized item snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub product_id: Uuid,
    pub domain_name: String,
    pub domain_price: Decimal,
    pub quantity: i32,
    pub line_total: Decimal,
}

/// Invoice lookups. Invoices are written by the checkout transaction and
/// read-only afterwards apart from the `transaction_created` flag, which
/// `services::payments` flips.
#[derive(Clone)]
pub struct InvoicingService {
    db: Arc<DatabaseConnection>,
}

impl InvoicingService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn get_invoice(&self, invoice_id: Uuid) -> Result<InvoiceModel, ServiceError> {
        InvoiceEntity::find_by_id(invoice_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Invoice {} not found", invoice_id)))
    }

    /// The invoice issued for an order; exactly one exists on the common path.
    #[instrument(skip(self))]
    pub async fn invoice_for_order(&self, order_id: Uuid) -> Result<InvoiceModel, ServiceError> {
        InvoiceEntity::find()
            .filter(invoice::Column::OrderId.eq(order_id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("No invoice found for order {}", order_id))
            })
    }

    /// Deserialized line snapshot of an invoice.
    pub fn lines(&self, invoice: &InvoiceModel) -> Result<Vec<InvoiceLine>, ServiceError> {
        serde_json::from_value(invoice.line_items.clone())
            .map_err(|e| ServiceError::InternalError(format!("Corrupt invoice lines: {}", e)))
    }
}
