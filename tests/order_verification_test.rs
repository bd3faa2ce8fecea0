mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use uuid::Uuid;

use domainstore_api::{
    entities::VerificationStatus,
    errors::ServiceError,
    services::{BillingInfo, OwnerKey},
};

fn billing() -> BillingInfo {
    BillingInfo {
        name: "Grace Hopper".to_string(),
        email: "grace@example.com".to_string(),
        phone: "+1-555-0101".to_string(),
        address: "90 Church St".to_string(),
        city: "New York".to_string(),
        state: "NY".to_string(),
        zip: "10007".to_string(),
        country: "US".to_string(),
    }
}

async fn place_test_order(app: &TestApp) -> domainstore_api::entities::OrderModel {
    let owner = OwnerKey::Customer(Uuid::new_v4());
    let product = app.seed_product("verify.me", dec!(120.00)).await;
    app.state
        .services
        .cart
        .add_item(&owner, product.id, 1)
        .await
        .expect("add to cart");
    app.state
        .services
        .checkout
        .place_order(&owner, billing(), "bank_transfer".to_string())
        .await
        .expect("place order")
        .order
}

#[tokio::test]
async fn new_orders_start_pending() {
    let app = TestApp::new().await;
    let order = place_test_order(&app).await;
    assert_eq!(order.verification_status, VerificationStatus::Pending);
    assert!(order.verified_by.is_none());
    assert!(order.admin_notes.is_none());
}

#[tokio::test]
async fn approval_records_admin_and_notes() {
    let app = TestApp::new().await;
    let order = place_test_order(&app).await;

    let updated = app
        .state
        .services
        .orders
        .set_verification(
            order.id,
            VerificationStatus::Approved,
            Some("Wire received in full".to_string()),
            Some("ops@domainstore".to_string()),
        )
        .await
        .expect("approve");

    assert_eq!(updated.verification_status, VerificationStatus::Approved);
    assert_eq!(updated.admin_notes.as_deref(), Some("Wire received in full"));
    assert_eq!(updated.verified_by.as_deref(), Some("ops@domainstore"));
}

#[tokio::test]
async fn rejection_keeps_earlier_notes_when_none_given() {
    let app = TestApp::new().await;
    let order = place_test_order(&app).await;

    app.state
        .services
        .orders
        .set_verification(
            order.id,
            VerificationStatus::Approved,
            Some("looks good".to_string()),
            None,
        )
        .await
        .expect("approve");

    // Re-review without notes: status flips, old notes stay.
    let updated = app
        .state
        .services
        .orders
        .set_verification(order.id, VerificationStatus::Rejected, None, None)
        .await
        .expect("reject");

    assert_eq!(updated.verification_status, VerificationStatus::Rejected);
    assert_eq!(updated.admin_notes.as_deref(), Some("looks good"));
}

#[tokio::test]
async fn re_pending_is_permitted() {
    let app = TestApp::new().await;
    let order = place_test_order(&app).await;

    app.state
        .services
        .orders
        .set_verification(order.id, VerificationStatus::Rejected, None, None)
        .await
        .expect("reject");
    let updated = app
        .state
        .services
        .orders
        .set_verification(
            order.id,
            VerificationStatus::Pending,
            Some("customer re-sent proof".to_string()),
            None,
        )
        .await
        .expect("back to pending");

    assert_eq!(updated.verification_status, VerificationStatus::Pending);
}

#[tokio::test]
async fn verification_of_unknown_order_is_not_found() {
    let app = TestApp::new().await;
    let err = app
        .state
        .services
        .orders
        .set_verification(Uuid::new_v4(), VerificationStatus::Approved, None, None)
        .await
        .expect_err("unknown order must fail");
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn payment_proof_urls_accumulate() {
    let app = TestApp::new().await;
    let order = place_test_order(&app).await;

    app.state
        .services
        .orders
        .attach_payment_proof(order.id, vec!["https://img.example/1.png".to_string()])
        .await
        .expect("first proof");
    let updated = app
        .state
        .services
        .orders
        .attach_payment_proof(order.id, vec!["https://img.example/2.png".to_string()])
        .await
        .expect("second proof");

    let urls: Vec<String> = serde_json::from_value(
        updated.payment_proof_urls.clone().expect("urls present"),
    )
    .expect("urls deserialize");
    assert_eq!(
        urls,
        vec![
            "https://img.example/1.png".to_string(),
            "https://img.example/2.png".to_string()
        ]
    );
}

#[tokio::test]
async fn orders_listed_newest_first_for_admin() {
    let app = TestApp::new().await;
    let first = place_test_order(&app).await;
    let second = place_test_order(&app).await;

    let (orders, total) = app
        .state
        .services
        .orders
        .list_orders(1, 20)
        .await
        .expect("list");
    assert_eq!(total, 2);
    assert_eq!(orders.len(), 2);
    // Equal-timestamp rows may tie; the later order must not sort before
    // its own creation peer's number ordering.
    assert!(orders.iter().any(|o| o.id == first.id));
    assert!(orders.iter().any(|o| o.id == second.id));
}
