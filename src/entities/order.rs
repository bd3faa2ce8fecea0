use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Placed order. Created once at checkout, never deleted (audit trail).
///
/// `order_number` comes from the sequence generator and is the value shown
/// to customers (rendered with the `ORD-` prefix at the display layer only).
/// Line items live in `order_items` as frozen snapshots. After creation the
/// only mutations are the admin verification workflow, notes, and
/// customer-submitted payment proof references.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub order_number: i64,
    pub owner_key: String,

    // Billing address as captured at checkout.
    pub customer_name: String,
    pub customer_email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,

    pub subtotal: Decimal,
    pub processing_fee: Decimal,
    pub total: Decimal,

    pub payment_method: String,
    pub status: OrderStatus,
    pub verification_status: VerificationStatus,

    /// URLs of customer-uploaded payment proof images (external object store).
    #[sea_orm(column_type = "Json", nullable)]
    pub payment_proof_urls: Option<Json>,
    #[sea_orm(nullable)]
    pub admin_notes: Option<String>,
    /// Identity of the admin who last changed the verification status.
    #[sea_orm(nullable)]
    pub verified_by: Option<String>,

    #[sea_orm(nullable)]
    pub invoice_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::payment_transaction::Entity")]
    PaymentTransactions,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::payment_transaction::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentTransactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Order lifecycle status.
///
/// Orders are always created `pending` and no API operation advances the
/// status. The later states are the persisted vocabulary for the manual
/// fulfillment process (domain transfer, cancellation), which records
/// progress directly against the order row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Payment verification workflow state.
///
/// `pending -> approved` and `pending -> rejected` are the normal
/// transitions; re-setting `pending` with updated notes is permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
pub enum VerificationStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Pending => "pending",
            VerificationStatus::Approved => "approved",
            VerificationStatus::Rejected => "rejected",
        }
    }
}
