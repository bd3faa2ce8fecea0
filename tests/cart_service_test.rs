mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use uuid::Uuid;

use domainstore_api::{errors::ServiceError, services::OwnerKey};

#[tokio::test]
async fn empty_owner_gets_empty_view_without_a_row() {
    let app = TestApp::new().await;
    let owner = OwnerKey::Guest("nobody".to_string());

    let view = app.state.services.cart.get_cart(&owner).await.expect("cart");
    assert!(view.items.is_empty());
    assert_eq!(view.subtotal, dec!(0));
    assert_eq!(view.cart.id, Uuid::nil());
}

#[tokio::test]
async fn adding_same_product_merges_the_line() {
    let app = TestApp::new().await;
    let owner = OwnerKey::Customer(Uuid::new_v4());
    let product = app.seed_product("merge.me", dec!(20.00)).await;

    app.state
        .services
        .cart
        .add_item(&owner, product.id, 1)
        .await
        .expect("first add");
    let view = app
        .state
        .services
        .cart
        .add_item(&owner, product.id, 2)
        .await
        .expect("second add");

    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].quantity, 3);
    assert_eq!(view.subtotal, dec!(60.00));
}

#[tokio::test]
async fn subtotal_recomputes_after_every_mutation() {
    let app = TestApp::new().await;
    let owner = OwnerKey::Customer(Uuid::new_v4());
    let cheap = app.seed_product("cheap.site", dec!(5.00)).await;
    let dear = app.seed_product("dear.site", dec!(400.00)).await;

    app.state
        .services
        .cart
        .add_item(&owner, cheap.id, 2)
        .await
        .expect("add cheap");
    let view = app
        .state
        .services
        .cart
        .add_item(&owner, dear.id, 1)
        .await
        .expect("add dear");
    assert_eq!(view.subtotal, dec!(410.00));

    let dear_line = view
        .items
        .iter()
        .find(|i| i.product_id == dear.id)
        .expect("dear line")
        .id;
    let view = app
        .state
        .services
        .cart
        .remove_item(&owner, dear_line)
        .await
        .expect("remove dear");
    assert_eq!(view.subtotal, dec!(10.00));
}

#[tokio::test]
async fn quantity_below_one_is_coerced_up() {
    let app = TestApp::new().await;
    let owner = OwnerKey::Guest("coerce".to_string());
    let product = app.seed_product("one.min", dec!(30.00)).await;

    let view = app
        .state
        .services
        .cart
        .add_item(&owner, product.id, -5)
        .await
        .expect("add with negative quantity");
    assert_eq!(view.items[0].quantity, 1);

    let view = app
        .state
        .services
        .cart
        .update_quantity(&owner, view.items[0].id, 0)
        .await
        .expect("update to zero");
    assert_eq!(view.items[0].quantity, 1);
    assert_eq!(view.subtotal, dec!(30.00));
}

#[tokio::test]
async fn unknown_product_is_rejected() {
    let app = TestApp::new().await;
    let owner = OwnerKey::Guest("ghost".to_string());

    let err = app
        .state
        .services
        .cart
        .add_item(&owner, Uuid::new_v4(), 1)
        .await
        .expect_err("missing product must fail");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn items_are_scoped_to_their_owner() {
    let app = TestApp::new().await;
    let alice = OwnerKey::Customer(Uuid::new_v4());
    let bob = OwnerKey::Customer(Uuid::new_v4());
    let product = app.seed_product("mine.only", dec!(50.00)).await;

    let alice_view = app
        .state
        .services
        .cart
        .add_item(&alice, product.id, 1)
        .await
        .expect("alice adds");

    // Bob cannot mutate a line in Alice's cart.
    let err = app
        .state
        .services
        .cart
        .update_quantity(&bob, alice_view.items[0].id, 5)
        .await
        .expect_err("cross-owner update must fail");
    assert!(matches!(err, ServiceError::InvalidOperation(_)));

    let bob_view = app.state.services.cart.get_cart(&bob).await.expect("cart");
    assert!(bob_view.items.is_empty());
}

#[tokio::test]
async fn clear_removes_every_line() {
    let app = TestApp::new().await;
    let owner = OwnerKey::Guest("clearing".to_string());
    let a = app.seed_product("a.wipe", dec!(1.00)).await;
    let b = app.seed_product("b.wipe", dec!(2.00)).await;

    app.state
        .services
        .cart
        .add_item(&owner, a.id, 1)
        .await
        .expect("add a");
    app.state
        .services
        .cart
        .add_item(&owner, b.id, 1)
        .await
        .expect("add b");

    app.state.services.cart.clear(&owner).await.expect("clear");

    let view = app.state.services.cart.get_cart(&owner).await.expect("cart");
    assert!(view.items.is_empty());
    assert_eq!(view.subtotal, dec!(0));
}

#[test]
fn owner_keys_round_trip_through_their_encoding() {
    let id = Uuid::new_v4();
    let customer = OwnerKey::Customer(id);
    assert_eq!(
        OwnerKey::parse(&customer.encode()).expect("parse"),
        customer
    );

    let guest = OwnerKey::Guest("sess-9".to_string());
    assert_eq!(guest.encode(), "guest:sess-9");
    assert_eq!(OwnerKey::parse("guest:sess-9").expect("parse"), guest);

    assert!(OwnerKey::parse("admin:1").is_err());
    assert!(OwnerKey::parse("customer:not-a-uuid").is_err());
}
