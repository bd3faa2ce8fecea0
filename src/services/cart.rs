use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    entities::{
        cart, cart_item,
        cart_item::Entity as CartItemEntity,
        Cart as CartEntity, CartItemModel, CartModel, Product as ProductEntity,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Identity a cart is stored under.
///
/// Authenticated customers use their stable user id; anonymous shoppers use
/// a client-generated guest id persisted on their device, which is the only
/// identity-continuity mechanism guests have across sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OwnerKey {
    Customer(Uuid),
    Guest(String),
}

impl OwnerKey {
    /// Storage encoding, also used in events and request paths.
    pub fn encode(&self) -> String {
        match self {
            OwnerKey::Customer(id) => format!("customer:{}", id),
            OwnerKey::Guest(id) => format!("guest:{}", id),
        }
    }

    pub fn parse(s: &str) -> Result<Self, ServiceError> {
        match s.split_once(':') {
            Some(("customer", id)) => {
                let uuid = Uuid::parse_str(id).map_err(|_| {
                    ServiceError::InvalidInput(format!("Invalid customer id: {}", id))
                })?;
                Ok(OwnerKey::Customer(uuid))
            }
            Some(("guest", id)) if !id.is_empty() => Ok(OwnerKey::Guest(id.to_string())),
            _ => Err(ServiceError::InvalidInput(format!(
                "Invalid owner key: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for OwnerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Cart contents with the subtotal recomputed from the live items.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub cart: CartModel,
    pub items: Vec<CartItemModel>,
    pub subtotal: Decimal,
}

/// Per-owner mutable cart store.
///
/// The store is the single source of truth: every read goes back to it, and
/// the subtotal is recomputed from current items on each call rather than
/// cached. Every successful mutation publishes a cart-changed event so
/// independent consumers resynchronize without polling.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DatabaseConnection>,
    event_sender: EventSender,
}

impl CartService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Current cart contents and subtotal for an owner. An owner with no
    /// cart yet gets an empty view without a row being created.
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn get_cart(&self, owner: &OwnerKey) -> Result<CartView, ServiceError> {
        let cart = CartEntity::find()
            .filter(cart::Column::OwnerKey.eq(owner.encode()))
            .one(&*self.db)
            .await?;

        let Some(cart) = cart else {
            return Ok(CartView {
                cart: CartModel {
                    id: Uuid::nil(),
                    owner_key: owner.encode(),
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                },
                items: Vec::new(),
                subtotal: Decimal::ZERO,
            });
        };

        let items = CartItemEntity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .order_by_asc(cart_item::Column::AddedAt)
            .all(&*self.db)
            .await?;

        let subtotal = subtotal_of(&items);
        Ok(CartView {
            cart,
            items,
            subtotal,
        })
    }

    /// Add a catalog product to the owner's cart, snapshotting its name,
    /// price and image. An existing line for the same product has its
    /// quantity incremented instead of a duplicate being created.
    #[instrument(skip(self), fields(owner = %owner, product_id = %product_id))]
    pub async fn add_item(
        &self,
        owner: &OwnerKey,
        product_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        let quantity = quantity.max(1);
        let txn = self.db.begin().await?;

        let product = ProductEntity::find_by_id(product_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;

        let cart = self.get_or_create_cart(&txn, owner).await?;

        let existing = CartItemEntity::find()
            .filter(cart_item::Column::CartId.eq(cart.id))
            .filter(cart_item::Column::ProductId.eq(product_id))
            .one(&txn)
            .await?;

        let item_id = match existing {
            Some(item) => {
                let current = item.quantity;
                let id = item.id;
                let mut item: cart_item::ActiveModel = item.into();
                item.quantity = Set(current + quantity);
                item.update(&txn).await?;
                id
            }
            None => {
                let id = Uuid::new_v4();
                let item = cart_item::ActiveModel {
                    id: Set(id),
                    cart_id: Set(cart.id),
                    product_id: Set(product.id),
                    domain_name: Set(product.domain_name.clone()),
                    unit_price: Set(product.price),
                    image_url: Set(product.image_url.clone()),
                    quantity: Set(quantity),
                    added_at: Set(Utc::now()),
                };
                item.insert(&txn).await?;
                id
            }
        };

        touch_cart(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender.send_or_log(Event::CartItemAdded {
            owner_key: owner.encode(),
            item_id,
        });
        info!("added {} x{} to cart", product.domain_name, quantity);

        self.get_cart(owner).await
    }

    /// Set a line's quantity. Values below 1 are coerced up to 1; removing a
    /// line is an explicit separate operation.
    #[instrument(skip(self), fields(owner = %owner, item_id = %item_id))]
    pub async fn update_quantity(
        &self,
        owner: &OwnerKey,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<CartView, ServiceError> {
        let quantity = quantity.max(1);
        let txn = self.db.begin().await?;

        let (item, cart) = self.owned_item(&txn, owner, item_id).await?;

        let mut item: cart_item::ActiveModel = item.into();
        item.quantity = Set(quantity);
        item.update(&txn).await?;

        touch_cart(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender.send_or_log(Event::CartItemUpdated {
            owner_key: owner.encode(),
            item_id,
        });

        self.get_cart(owner).await
    }

    /// Remove a single line from the owner's cart.
    #[instrument(skip(self), fields(owner = %owner, item_id = %item_id))]
    pub async fn remove_item(
        &self,
        owner: &OwnerKey,
        item_id: Uuid,
    ) -> Result<CartView, ServiceError> {
        let txn = self.db.begin().await?;

        let (_, cart) = self.owned_item(&txn, owner, item_id).await?;
        CartItemEntity::delete_by_id(item_id).exec(&txn).await?;

        touch_cart(&txn, cart).await?;
        txn.commit().await?;

        self.event_sender.send_or_log(Event::CartItemRemoved {
            owner_key: owner.encode(),
            item_id,
        });

        self.get_cart(owner).await
    }

    /// Drop every line in the owner's cart (post-checkout or explicit).
    #[instrument(skip(self), fields(owner = %owner))]
    pub async fn clear(&self, owner: &OwnerKey) -> Result<(), ServiceError> {
        let txn = self.db.begin().await?;

        let cart = CartEntity::find()
            .filter(cart::Column::OwnerKey.eq(owner.encode()))
            .one(&txn)
            .await?;

        if let Some(cart) = cart {
            CartItemEntity::delete_many()
                .filter(cart_item::Column::CartId.eq(cart.id))
                .exec(&txn)
                .await?;
            touch_cart(&txn, cart).await?;
        }

        txn.commit().await?;

        self.event_sender.send_or_log(Event::CartCleared {
            owner_key: owner.encode(),
        });
        info!("cleared cart");
        Ok(())
    }

    async fn get_or_create_cart(
        &self,
        conn: &impl ConnectionTrait,
        owner: &OwnerKey,
    ) -> Result<CartModel, ServiceError> {
        let existing = CartEntity::find()
            .filter(cart::Column::OwnerKey.eq(owner.encode()))
            .one(conn)
            .await?;

        if let Some(cart) = existing {
            return Ok(cart);
        }

        let cart = cart::ActiveModel {
            id: Set(Uuid::new_v4()),
            owner_key: Set(owner.encode()),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        };
        Ok(cart.insert(conn).await?)
    }

    /// Fetch an item and assert it belongs to the owner's cart.
    async fn owned_item(
        &self,
        conn: &impl ConnectionTrait,
        owner: &OwnerKey,
        item_id: Uuid,
    ) -> Result<(CartItemModel, CartModel), ServiceError> {
        let item = CartItemEntity::find_by_id(item_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        let cart = CartEntity::find_by_id(item.cart_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart {} not found", item.cart_id)))?;

        if cart.owner_key != owner.encode() {
            return Err(ServiceError::InvalidOperation(
                "Item does not belong to this cart".to_string(),
            ));
        }

        Ok((item, cart))
    }
}

/// Subtotal of a set of cart lines: Σ unit_price × quantity.
pub fn subtotal_of(items: &[CartItemModel]) -> Decimal {
    items
        .iter()
        .map(|item| item.unit_price * Decimal::from(item.quantity))
        .sum()
}

async fn touch_cart(conn: &impl ConnectionTrait, cart: CartModel) -> Result<(), ServiceError> {
    let mut cart: cart::ActiveModel = cart.into();
    cart.updated_at = Set(Utc::now());
    cart.update(conn).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(price: Decimal, quantity: i32) -> CartItemModel {
        CartItemModel {
            id: Uuid::new_v4(),
            cart_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            domain_name: "example.com".to_string(),
            unit_price: price,
            image_url: None,
            quantity,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn owner_key_round_trips_through_encoding() {
        let id = Uuid::new_v4();
        let customer = OwnerKey::Customer(id);
        assert_eq!(
            OwnerKey::parse(&customer.encode()).expect("parse"),
            customer
        );

        let guest = OwnerKey::Guest("g-12345".to_string());
        assert_eq!(guest.encode(), "guest:g-12345");
        assert_eq!(OwnerKey::parse("guest:g-12345").expect("parse"), guest);
    }

    #[test]
    fn malformed_owner_keys_are_rejected() {
        assert!(OwnerKey::parse("guest:").is_err());
        assert!(OwnerKey::parse("customer:not-a-uuid").is_err());
        assert!(OwnerKey::parse("session-12345").is_err());
        assert!(OwnerKey::parse("").is_err());
    }

    #[test]
    fn subtotal_is_sum_of_price_times_quantity() {
        let items = vec![
            item(dec!(1000.00), 1),
            item(dec!(49.99), 2),
            item(dec!(0.01), 100),
        ];
        assert_eq!(subtotal_of(&items), dec!(1100.98));
    }

    #[test]
    fn subtotal_of_empty_cart_is_zero() {
        assert_eq!(subtotal_of(&[]), Decimal::ZERO);
    }
}
