use std::sync::Arc;

use chrono::Utc;
use rust_decimal::{prelude::FromPrimitive, Decimal, RoundingStrategy};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{
        cart_item, invoice, order, order_item, CartItem as CartItemEntity, InvoiceModel,
        OrderModel, OrderStatus, VerificationStatus,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        cart::{subtotal_of, CartService, OwnerKey},
        invoicing::InvoiceLine,
        sequence::{CounterKind, SequenceService},
    },
};

/// Billing details collected by the checkout form.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct BillingInfo {
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Email must be well-formed"))]
    pub email: String,
    #[validate(length(min = 1, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, message = "Address is required"))]
    pub address: String,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, message = "State is required"))]
    pub state: String,
    #[validate(length(min = 1, message = "Zip is required"))]
    pub zip: String,
    #[validate(length(min = 1, message = "Country is required"))]
    pub country: String,
}

/// Result of a successful checkout, carrying the numbers shown to the
/// customer on the confirmation page.
#[derive(Debug, Serialize)]
pub struct OrderConfirmation {
    pub order: OrderModel,
    pub invoice: InvoiceModel,
    pub order_number_display: String,
    pub invoice_number_display: String,
}

/// Converts a validated cart into an immutable order plus its invoice.
///
/// Order and invoice numbers are allocated up front by the sequence
/// generator; the order, its line-item snapshots, the invoice, the invoice
/// back-link and the cart clear then commit in a single transaction, so a
/// failed attempt leaves the cart intact and never strands an order without
/// an invoice. Numbers consumed by a failed attempt are burned, not reused.
///
/// `place_order` is not idempotent: invoking it again with an identical,
/// re-populated cart creates a second order under a new number. Callers that
/// need retry safety must deduplicate upstream.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DatabaseConnection>,
    cart_service: CartService,
    sequence: SequenceService,
    event_sender: EventSender,
    fee_rate: Decimal,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        cart_service: CartService,
        sequence: SequenceService,
        event_sender: EventSender,
        fee_rate: f64,
    ) -> Self {
        Self {
            db,
            cart_service,
            sequence,
            event_sender,
            fee_rate: Decimal::from_f64(fee_rate).unwrap_or_else(|| Decimal::new(3, 2)),
        }
    }

    /// Place an order from the owner's current cart.
    #[instrument(skip(self, billing), fields(owner = %owner))]
    pub async fn place_order(
        &self,
        owner: &OwnerKey,
        billing: BillingInfo,
        payment_method: String,
    ) -> Result<OrderConfirmation, ServiceError> {
        billing
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        if payment_method.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Payment method is required".to_string(),
            ));
        }

        // Live snapshot of the cart; prices are frozen from here on.
        let cart_view = self.cart_service.get_cart(owner).await?;
        if cart_view.items.is_empty() {
            return Err(ServiceError::InvalidOperation(
                "Cart is empty".to_string(),
            ));
        }

        let subtotal = subtotal_of(&cart_view.items);
        let fee = processing_fee(subtotal, self.fee_rate);
        let total = subtotal + fee;

        // A degraded wall-clock number is collision-prone; failing the
        // checkout so the customer can retry is the better trade here.
        let order_number = self.sequence.next_allocated(CounterKind::Orders).await?;
        let invoice_number = self.sequence.next_allocated(CounterKind::Invoices).await?;

        let order_id = Uuid::new_v4();
        let invoice_id = Uuid::new_v4();
        let now = Utc::now();

        let txn = self.db.begin().await?;

        let order_row = order::ActiveModel {
            id: Set(order_id),
            order_number: Set(order_number),
            owner_key: Set(owner.encode()),
            customer_name: Set(billing.name.clone()),
            customer_email: Set(billing.email.clone()),
            phone: Set(billing.phone.clone()),
            address: Set(billing.address.clone()),
            city: Set(billing.city.clone()),
            state: Set(billing.state.clone()),
            zip: Set(billing.zip.clone()),
            country: Set(billing.country.clone()),
            subtotal: Set(subtotal),
            processing_fee: Set(fee),
            total: Set(total),
            payment_method: Set(payment_method.clone()),
            status: Set(OrderStatus::Pending),
            verification_status: Set(VerificationStatus::Pending),
            payment_proof_urls: Set(None),
            admin_notes: Set(None),
            verified_by: Set(None),
            invoice_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let order = order_row.insert(&txn).await?;

        let mut invoice_lines = Vec::with_capacity(cart_view.items.len());
        for cart_line in &cart_view.items {
            let line_total = cart_line.unit_price * Decimal::from(cart_line.quantity);
            let item = order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(cart_line.product_id),
                domain_name: Set(cart_line.domain_name.clone()),
                domain_price: Set(cart_line.unit_price),
                image_url: Set(cart_line.image_url.clone()),
                quantity: Set(cart_line.quantity),
                line_total: Set(line_total),
            };
            item.insert(&txn).await?;

            invoice_lines.push(InvoiceLine {
                product_id: cart_line.product_id,
                domain_name: cart_line.domain_name.clone(),
                domain_price: cart_line.unit_price,
                quantity: cart_line.quantity,
                line_total,
            });
        }

        let invoice_row = invoice::ActiveModel {
            id: Set(invoice_id),
            invoice_number: Set(invoice_number),
            order_id: Set(order_id),
            line_items: Set(serde_json::to_value(&invoice_lines)
                .map_err(|e| ServiceError::InternalError(e.to_string()))?),
            subtotal: Set(subtotal),
            processing_fee: Set(fee),
            total: Set(total),
            transaction_created: Set(false),
            issued_at: Set(now),
        };
        let invoice = invoice_row.insert(&txn).await?;

        // Link the invoice back onto the order.
        let mut order_update: order::ActiveModel = order.into();
        order_update.invoice_id = Set(Some(invoice_id));
        let order = order_update.update(&txn).await?;

        // Clear the cart inside the same transaction: a failure anywhere
        // above rolls this back and the customer keeps their items.
        CartItemEntity::delete_many()
            .filter(cart_item::Column::CartId.eq(cart_view.cart.id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        self.event_sender.send_or_log(Event::OrderPlaced {
            order_id,
            order_number,
        });
        self.event_sender.send_or_log(Event::InvoiceIssued {
            invoice_id,
            order_id,
            invoice_number,
        });
        self.event_sender.send_or_log(Event::CartCleared {
            owner_key: owner.encode(),
        });

        info!(
            order_number,
            invoice_number,
            %total,
            "order placed"
        );

        Ok(OrderConfirmation {
            order_number_display: CounterKind::Orders.format(order_number),
            invoice_number_display: CounterKind::Invoices.format(invoice_number),
            order,
            invoice,
        })
    }
}

/// Processing fee: a fixed fraction of the subtotal, rounded half-up at the
/// cent.
pub fn processing_fee(subtotal: Decimal, rate: Decimal) -> Decimal {
    (subtotal * rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const RATE: Decimal = dec!(0.03);

    #[test]
    fn fee_for_the_canonical_example() {
        // 1000.00 x 3% = 30.00
        assert_eq!(processing_fee(dec!(1000.00), RATE), dec!(30.00));
    }

    #[test]
    fn fee_rounds_half_up_at_the_cent() {
        // 16.50 x 0.03 = 0.4950, midpoint rounds away from zero
        assert_eq!(processing_fee(dec!(16.50), RATE), dec!(0.50));
        // 0.50 x 0.03 = 0.0150
        assert_eq!(processing_fee(dec!(0.50), RATE), dec!(0.02));
    }

    #[test]
    fn fee_below_midpoint_rounds_down() {
        // 33.45 x 0.03 = 1.0035
        assert_eq!(processing_fee(dec!(33.45), RATE), dec!(1.00));
    }

    #[test]
    fn fee_on_zero_subtotal_is_zero() {
        assert_eq!(processing_fee(Decimal::ZERO, RATE), Decimal::ZERO);
    }

    #[test]
    fn total_identity_holds() {
        let subtotal = dec!(1000.00);
        let fee = processing_fee(subtotal, RATE);
        assert_eq!(subtotal + fee, dec!(1030.00));
    }

    #[test]
    fn billing_info_requires_a_well_formed_email() {
        let billing = BillingInfo {
            name: "Ada".into(),
            email: "not-an-email".into(),
            phone: "555-0100".into(),
            address: "1 Main St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            zip: "62701".into(),
            country: "US".into(),
        };
        assert!(billing.validate().is_err());
    }

    #[test]
    fn billing_info_rejects_missing_fields() {
        let billing = BillingInfo {
            name: "".into(),
            email: "ada@example.com".into(),
            phone: "".into(),
            address: "1 Main St".into(),
            city: "Springfield".into(),
            state: "IL".into(),
            zip: "62701".into(),
            country: "US".into(),
        };
        let err = billing.validate().expect_err("must fail");
        let text = err.to_string();
        assert!(text.contains("Name") || text.contains("name"));
    }
}
