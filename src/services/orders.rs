use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{order, Order as OrderEntity, OrderModel, VerificationStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Order lookup and the administrative payment-verification workflow.
///
/// Orders are never deleted; they are the audit trail. Admin edits use plain
/// last-write-wins updates: two admins saving the same order concurrently
/// will silently overwrite each other, which is accepted for the back
/// office's low-concurrency usage and deliberately not strengthened here.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl OrderService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<OrderModel, ServiceError> {
        OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))
    }

    #[instrument(skip(self))]
    pub async fn get_order_by_number(&self, order_number: i64) -> Result<OrderModel, ServiceError> {
        OrderEntity::find()
            .filter(order::Column::OrderNumber.eq(order_number))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order number {} not found", order_number))
            })
    }

    /// Orders for one storefront customer, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders_for_owner(
        &self,
        owner_key: &str,
    ) -> Result<Vec<OrderModel>, ServiceError> {
        Ok(OrderEntity::find()
            .filter(order::Column::OwnerKey.eq(owner_key))
            .order_by_desc(order::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }

    /// Paginated admin listing, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<OrderModel>, u64), ServiceError> {
        let paginator = OrderEntity::find()
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let data = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((data, total))
    }

    /// Apply a payment-verification transition.
    ///
    /// `pending -> approved` and `pending -> rejected` are the normal flow;
    /// both are terminal by convention, though re-setting `pending` with
    /// updated notes is permitted, as the admin interface always has.
    #[instrument(skip(self, notes), fields(order_id = %order_id, new_status = new_status.as_str()))]
    pub async fn set_verification(
        &self,
        order_id: Uuid,
        new_status: VerificationStatus,
        notes: Option<String>,
        admin: Option<String>,
    ) -> Result<OrderModel, ServiceError> {
        let order = self.get_order(order_id).await?;
        let old_status = order.verification_status;

        let mut active: order::ActiveModel = order.into();
        active.verification_status = Set(new_status);
        if let Some(notes) = notes {
            active.admin_notes = Set(Some(notes));
        }
        if let Some(admin) = admin {
            active.verified_by = Set(Some(admin));
        }
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::OrderVerificationChanged {
                order_id,
                old_status: old_status.as_str().to_string(),
                new_status: new_status.as_str().to_string(),
            });
        info!(
            "order {} verification: {} -> {}",
            order_id,
            old_status.as_str(),
            new_status.as_str()
        );

        Ok(updated)
    }

    /// Append customer-uploaded payment-proof references to an order. The
    /// URLs come from the external object store; the order keeps only the
    /// references.
    #[instrument(skip(self, urls))]
    pub async fn attach_payment_proof(
        &self,
        order_id: Uuid,
        urls: Vec<String>,
    ) -> Result<OrderModel, ServiceError> {
        if urls.is_empty() {
            return Err(ServiceError::InvalidInput(
                "At least one payment proof URL is required".to_string(),
            ));
        }

        let order = self.get_order(order_id).await?;

        let mut existing: Vec<String> = order
            .payment_proof_urls
            .as_ref()
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default();
        existing.extend(urls);

        let mut active: order::ActiveModel = order.into();
        active.payment_proof_urls = Set(Some(
            serde_json::to_value(&existing)
                .map_err(|e| ServiceError::InternalError(e.to_string()))?,
        ));
        active.updated_at = Set(Utc::now());

        let updated = active.update(&*self.db).await?;

        self.event_sender
            .send_or_log(Event::PaymentProofAttached { order_id });

        Ok(updated)
    }
}
