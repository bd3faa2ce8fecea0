use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Invoice issued for an order; exactly one per order on the common path.
///
/// Line items are a denormalized JSON copy of the order's items at issuance
/// time and the monetary totals must match the parent order. Read-only after
/// creation apart from `transaction_created`, which flips when a payment
/// transaction is recorded against it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub invoice_number: i64,
    pub order_id: Uuid,
    #[sea_orm(column_type = "Json")]
    pub line_items: Json,
    pub subtotal: Decimal,
    pub processing_fee: Decimal,
    pub total: Decimal,
    pub transaction_created: bool,
    pub issued_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
