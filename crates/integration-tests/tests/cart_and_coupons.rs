//! Cart synchronization and coupon validation tests against the in-process
//! fake backend.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::json;

use marigold_checkout::api::{ApiError, StoreApiClient};
use marigold_checkout::cart::CartStore;
use marigold_checkout::coupon::CouponEngine;
use marigold_checkout::storage::MemoryStorage;

use marigold_integration_tests::FakeStore;

async fn api(store: &FakeStore) -> StoreApiClient {
    StoreApiClient::new(&store.config()).expect("build api client")
}

fn remote_line(product: &str, variant: &str, quantity: u32, price: f64) -> serde_json::Value {
    json!({
        "productId": product,
        "variantId": variant,
        "name": "Linen Shirt",
        "unitPrice": price,
        "quantity": quantity,
        "imageUrl": null,
        "size": "M",
        "stock": 10,
    })
}

#[tokio::test]
async fn test_replace_from_remote_overwrites_local_cart() {
    let store = FakeStore::spawn().await;
    store.set_cart_items(vec![
        remote_line("p1", "v1", 2, 720.0),
        remote_line("p2", "v2", 1, 499.5),
    ]);
    let api = api(&store).await;

    let mut cart = CartStore::new(Arc::new(MemoryStorage::new()));
    cart.replace_from_remote(&api, "user_1")
        .await
        .expect("fetch remote cart");

    assert_eq!(cart.items().len(), 2);
    assert_eq!(cart.total_quantity(), 3);
    assert_eq!(cart.subtotal(), Decimal::new(19395, 1)); // 2*720 + 499.5
}

#[tokio::test]
async fn test_clear_remote_failure_still_clears_local() {
    let store = FakeStore::spawn().await;
    store.set_cart_items(vec![remote_line("p1", "v1", 2, 720.0)]);
    store.fail_clear_cart();
    let api = api(&store).await;

    let mut cart = CartStore::new(Arc::new(MemoryStorage::new()));
    cart.replace_from_remote(&api, "user_1")
        .await
        .expect("fetch remote cart");
    assert!(!cart.is_empty());

    let result = cart.clear_remote(&api, "user_1").await;
    assert!(matches!(result, Err(ApiError::Api { status: 500, .. })));
    assert_eq!(store.clear_cart_calls(), 1);
    // Local state is cleared regardless; checkout already happened.
    assert!(cart.is_empty());
}

#[tokio::test]
async fn test_coupon_below_min_purchase_is_rejected_verbatim() {
    let store = FakeStore::spawn().await;
    let api = api(&store).await;
    let mut engine = CouponEngine::new(api, Arc::new(MemoryStorage::new()));

    let result = engine.apply("SAVE100", Decimal::new(900, 0)).await;

    let Err(ApiError::Api { status, message }) = result else {
        panic!("expected server rejection");
    };
    assert_eq!(status, 400);
    // The server's own message, unmodified.
    assert_eq!(message, "Minimum purchase of ₹1000 required for this coupon");
    assert!(engine.applied().is_none());
}

#[tokio::test]
async fn test_coupon_apply_replaces_rather_than_stacks() {
    let store = FakeStore::spawn().await;
    let api = api(&store).await;
    let mut engine = CouponEngine::new(api, Arc::new(MemoryStorage::new()));

    engine
        .apply("FESTIVE10", Decimal::new(1500, 0))
        .await
        .expect("first coupon applies");
    engine
        .apply("SAVE100", Decimal::new(1500, 0))
        .await
        .expect("second coupon applies");

    let applied = engine.applied().expect("a coupon is applied");
    assert_eq!(applied.code, "SAVE100");
    assert_eq!(applied.discount_amount, Decimal::new(100, 0));

    // One discount in the total, not two.
    let total = engine.order_total(Decimal::new(1500, 0), Decimal::ZERO, Decimal::ZERO);
    assert_eq!(total, Decimal::new(1400, 0));
}

#[tokio::test]
async fn test_available_coupons_are_cached() {
    let store = FakeStore::spawn().await;
    store.set_coupons(vec![json!({
        "id": "c1",
        "code": "FESTIVE10",
        "description": "10% off festive picks",
        "discountPercent": 10.0,
        "minPurchase": 1000.0,
        "maxDiscount": 500.0,
        "expiresAt": "2099-01-01T00:00:00Z",
    })]);
    let api = api(&store).await;

    let first = api.available_coupons().await.expect("list coupons");
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].code, "FESTIVE10");

    // Second read is served from cache; a listing change is not yet visible.
    store.set_coupons(vec![]);
    let second = api.available_coupons().await.expect("list coupons again");
    assert_eq!(second.len(), 1);
}
