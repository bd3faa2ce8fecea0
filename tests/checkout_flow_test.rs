mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DatabaseBackend, Statement};
use uuid::Uuid;

use domainstore_api::{
    entities::{product, VerificationStatus},
    errors::ServiceError,
    services::{BillingInfo, OwnerKey},
};

fn billing() -> BillingInfo {
    BillingInfo {
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        phone: "+1-555-0100".to_string(),
        address: "1 Analytical Way".to_string(),
        city: "London".to_string(),
        state: "LDN".to_string(),
        zip: "E1 6AN".to_string(),
        country: "UK".to_string(),
    }
}

#[tokio::test]
async fn canonical_checkout_totals_and_numbering() {
    let app = TestApp::new().await;
    let owner = OwnerKey::Customer(Uuid::new_v4());

    let product = app.seed_product("brilliant.io", dec!(1000.00)).await;
    app.state
        .services
        .cart
        .add_item(&owner, product.id, 1)
        .await
        .expect("add to cart");

    let confirmation = app
        .state
        .services
        .checkout
        .place_order(&owner, billing(), "bank_transfer".to_string())
        .await
        .expect("place order");

    assert_eq!(confirmation.order.subtotal, dec!(1000.00));
    assert_eq!(confirmation.order.processing_fee, dec!(30.00));
    assert_eq!(confirmation.order.total, dec!(1030.00));
    assert_eq!(confirmation.order.order_number, 1001);
    assert_eq!(confirmation.invoice.invoice_number, 2);
    assert_eq!(confirmation.order_number_display, "ORD-1001");
    assert_eq!(
        confirmation.order.verification_status,
        VerificationStatus::Pending
    );
    assert_eq!(confirmation.order.invoice_id, Some(confirmation.invoice.id));

    // Cart is empty only after the order landed.
    let cart = app.state.services.cart.get_cart(&owner).await.expect("cart");
    assert!(cart.items.is_empty());
    assert_eq!(cart.subtotal, dec!(0));
}

#[tokio::test]
async fn empty_cart_rejected_without_burning_a_number() {
    let app = TestApp::new().await;
    let owner = OwnerKey::Guest("session-42".to_string());

    let err = app
        .state
        .services
        .checkout
        .place_order(&owner, billing(), "card".to_string())
        .await
        .expect_err("empty cart must fail");
    assert!(matches!(err, ServiceError::InvalidOperation(_)));

    // Rejection happens before any counter is touched.
    let current = app
        .state
        .services
        .sequence
        .current_value(domainstore_api::services::CounterKind::Orders)
        .await
        .expect("read counter");
    assert_eq!(current, None);
}

#[tokio::test]
async fn invalid_billing_leaves_cart_intact() {
    let app = TestApp::new().await;
    let owner = OwnerKey::Customer(Uuid::new_v4());

    let product = app.seed_product("keepme.net", dec!(250.00)).await;
    app.state
        .services
        .cart
        .add_item(&owner, product.id, 2)
        .await
        .expect("add to cart");

    let mut bad = billing();
    bad.email = "not-an-email".to_string();

    let err = app
        .state
        .services
        .checkout
        .place_order(&owner, bad, "card".to_string())
        .await
        .expect_err("invalid billing must fail");
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let cart = app.state.services.cart.get_cart(&owner).await.expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);
    assert_eq!(cart.subtotal, dec!(500.00));
}

#[tokio::test]
async fn persistence_failure_rolls_back_and_keeps_the_cart() {
    let app = TestApp::new().await;
    let owner = OwnerKey::Customer(Uuid::new_v4());

    let product = app.seed_product("survivor.io", dec!(75.00)).await;
    app.state
        .services
        .cart
        .add_item(&owner, product.id, 3)
        .await
        .expect("add to cart");

    // Simulated mid-transaction write failure: the invoice insert cannot
    // land, so the whole checkout transaction must roll back.
    app.state
        .db
        .execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            "DROP TABLE invoices".to_string(),
        ))
        .await
        .expect("drop invoices table");

    let err = app
        .state
        .services
        .checkout
        .place_order(&owner, billing(), "card".to_string())
        .await
        .expect_err("checkout must fail");
    assert!(matches!(err, ServiceError::DatabaseError(_)));

    // No half-written order survives the rollback.
    let (orders, total) = app
        .state
        .services
        .orders
        .list_orders(1, 20)
        .await
        .expect("list orders");
    assert_eq!(total, 0);
    assert!(orders.is_empty());

    // The customer keeps their items and can retry.
    let cart = app.state.services.cart.get_cart(&owner).await.expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);
    assert_eq!(cart.subtotal, dec!(225.00));
}

#[tokio::test]
async fn counter_outage_fails_checkout_and_keeps_the_cart() {
    let app = TestApp::new().await;
    let owner = OwnerKey::Customer(Uuid::new_v4());

    let product = app.seed_product("patient.io", dec!(120.00)).await;
    app.state
        .services
        .cart
        .add_item(&owner, product.id, 2)
        .await
        .expect("add to cart");

    // With the counter store gone the generator can only hand out degraded
    // wall-clock numbers, which checkout must refuse.
    app.state
        .db
        .execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            "DROP TABLE sequence_counters".to_string(),
        ))
        .await
        .expect("drop counter table");

    let err = app
        .state
        .services
        .checkout
        .place_order(&owner, billing(), "card".to_string())
        .await
        .expect_err("checkout must fail");
    assert!(matches!(err, ServiceError::SequenceUnavailable(_)));

    let (_, total) = app
        .state
        .services
        .orders
        .list_orders(1, 20)
        .await
        .expect("list orders");
    assert_eq!(total, 0);

    // The customer keeps their items and can retry once numbering recovers.
    let cart = app.state.services.cart.get_cart(&owner).await.expect("cart");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);
    assert_eq!(cart.subtotal, dec!(240.00));
}

#[tokio::test]
async fn order_lines_snapshot_prices_at_checkout() {
    let app = TestApp::new().await;
    let owner = OwnerKey::Customer(Uuid::new_v4());

    let product = app.seed_product("frozen.dev", dec!(99.00)).await;
    app.state
        .services
        .cart
        .add_item(&owner, product.id, 1)
        .await
        .expect("add to cart");

    let confirmation = app
        .state
        .services
        .checkout
        .place_order(&owner, billing(), "card".to_string())
        .await
        .expect("place order");

    // Catalog price changes after checkout must not reach the order.
    let mut row: product::ActiveModel = product.into();
    row.price = Set(dec!(9999.00));
    row.update(&*app.state.db).await.expect("reprice product");

    let invoice = app
        .state
        .services
        .invoicing
        .invoice_for_order(confirmation.order.id)
        .await
        .expect("invoice");
    let lines = app
        .state
        .services
        .invoicing
        .lines(&invoice)
        .expect("invoice lines");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].domain_price, dec!(99.00));
    assert_eq!(lines[0].line_total, dec!(99.00));

    let order = app
        .state
        .services
        .orders
        .get_order(confirmation.order.id)
        .await
        .expect("order");
    assert_eq!(order.subtotal, dec!(99.00));
}

#[tokio::test]
async fn repeated_checkout_of_same_cart_yields_distinct_orders() {
    let app = TestApp::new().await;
    let owner = OwnerKey::Customer(Uuid::new_v4());
    let product = app.seed_product("twice.org", dec!(10.00)).await;

    app.state
        .services
        .cart
        .add_item(&owner, product.id, 1)
        .await
        .expect("add to cart");
    let first = app
        .state
        .services
        .checkout
        .place_order(&owner, billing(), "card".to_string())
        .await
        .expect("first order");

    // Refill the same cart and check out again.
    app.state
        .services
        .cart
        .add_item(&owner, product.id, 1)
        .await
        .expect("refill cart");
    let second = app
        .state
        .services
        .checkout
        .place_order(&owner, billing(), "card".to_string())
        .await
        .expect("second order");

    assert_ne!(first.order.id, second.order.id);
    assert_eq!(first.order.order_number, 1001);
    assert_eq!(second.order.order_number, 1002);
    assert_ne!(first.invoice.invoice_number, second.invoice.invoice_number);
}

#[tokio::test]
async fn concurrent_first_checkouts_get_distinct_numbers() {
    let app = TestApp::new().await;
    let product = app.seed_product("race.dev", dec!(40.00)).await;

    let alice = OwnerKey::Customer(Uuid::new_v4());
    let bob = OwnerKey::Customer(Uuid::new_v4());
    for owner in [&alice, &bob] {
        app.state
            .services
            .cart
            .add_item(owner, product.id, 1)
            .await
            .expect("fill cart");
    }

    let checkout = app.state.services.checkout.clone();
    let a = {
        let checkout = checkout.clone();
        let owner = alice.clone();
        tokio::spawn(
            async move { checkout.place_order(&owner, billing(), "card".into()).await },
        )
    };
    let b = {
        let checkout = checkout.clone();
        let owner = bob.clone();
        tokio::spawn(
            async move { checkout.place_order(&owner, billing(), "card".into()).await },
        )
    };

    let first = a.await.expect("join").expect("checkout a");
    let second = b.await.expect("join").expect("checkout b");

    let mut numbers = [first.order.order_number, second.order.order_number];
    numbers.sort();
    assert_eq!(numbers, [1001, 1002]);
}

#[tokio::test]
async fn mixed_cart_fee_rounds_half_up_at_the_cent() {
    let app = TestApp::new().await;
    let owner = OwnerKey::Guest("rounding".to_string());

    // 16.50 * 0.03 = 0.495, which rounds up to 0.50.
    let product = app.seed_product("midpoint.app", dec!(16.50)).await;
    app.state
        .services
        .cart
        .add_item(&owner, product.id, 1)
        .await
        .expect("add to cart");

    let confirmation = app
        .state
        .services
        .checkout
        .place_order(&owner, billing(), "card".to_string())
        .await
        .expect("place order");

    assert_eq!(confirmation.order.processing_fee, dec!(0.50));
    assert_eq!(confirmation.order.total, dec!(17.00));
}
