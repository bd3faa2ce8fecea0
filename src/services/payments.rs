use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    TransactionTrait,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        invoice, payment_transaction, Invoice as InvoiceEntity, Order as OrderEntity,
        PaymentTransaction as PaymentTransactionEntity, PaymentTransactionModel,
        TransactionStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::sequence::{CounterKind, SequenceService},
};

/// Records reconciled payments as reporting-only transaction records.
///
/// A transaction snapshots the order's customer fields at recording time and
/// marks the parent invoice `transaction_created`; only its `status` may
/// change afterwards.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    sequence: SequenceService,
    event_sender: EventSender,
}

impl PaymentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        sequence: SequenceService,
        event_sender: EventSender,
    ) -> Self {
        Self {
            db,
            sequence,
            event_sender,
        }
    }

    /// Record a payment against an order.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn record_payment(
        &self,
        order_id: Uuid,
        amount: Decimal,
        currency: String,
    ) -> Result<PaymentTransactionModel, ServiceError> {
        if amount <= Decimal::ZERO {
            return Err(ServiceError::InvalidInput(
                "Payment amount must be positive".to_string(),
            ));
        }

        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let transaction_number = self
            .sequence
            .next_allocated(CounterKind::Transactions)
            .await?;

        let txn = self.db.begin().await?;

        let transaction_id = Uuid::new_v4();
        let record = payment_transaction::ActiveModel {
            id: Set(transaction_id),
            transaction_number: Set(transaction_number),
            order_id: Set(order_id),
            invoice_id: Set(order.invoice_id),
            amount: Set(amount),
            currency: Set(currency),
            payment_method: Set(order.payment_method.clone()),
            status: Set(TransactionStatus::Recorded),
            customer_name: Set(order.customer_name.clone()),
            customer_email: Set(order.customer_email.clone()),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        let record = record.insert(&txn).await?;

        // Flag the invoice so dashboards know a transaction exists for it.
        if let Some(invoice_id) = order.invoice_id {
            if let Some(inv) = InvoiceEntity::find_by_id(invoice_id).one(&txn).await? {
                let mut inv: invoice::ActiveModel = inv.into();
                inv.transaction_created = Set(true);
                inv.update(&txn).await?;
            }
        }

        txn.commit().await?;

        self.event_sender.send_or_log(Event::PaymentRecorded {
            transaction_id,
            order_id,
        });
        info!(transaction_number, "payment recorded");

        Ok(record)
    }

    /// Update a transaction's status, the only mutable field after creation.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<PaymentTransactionModel, ServiceError> {
        let record = PaymentTransactionEntity::find_by_id(transaction_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Transaction {} not found", transaction_id))
            })?;

        let mut active: payment_transaction::ActiveModel = record.into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db).await?)
    }

    /// Transactions recorded for an order, for the admin reporting screens.
    #[instrument(skip(self))]
    pub async fn transactions_for_order(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<PaymentTransactionModel>, ServiceError> {
        Ok(PaymentTransactionEntity::find()
            .filter(payment_transaction::Column::OrderId.eq(order_id))
            .all(&*self.db)
            .await?)
    }
}
