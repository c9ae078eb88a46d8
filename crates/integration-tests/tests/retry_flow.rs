//! Retry-payment flow tests against the in-process fake backend.

use std::sync::Arc;

use marigold_core::OrderId;

use marigold_checkout::api::StoreApiClient;
use marigold_checkout::error::PaymentErrorCode;
use marigold_checkout::gateway::CustomerPrefill;
use marigold_checkout::payment::{PaymentAttempt, RetryPaymentOrchestrator};

use marigold_integration_tests::{FakeStore, GatewayScript, ScriptedGateway};

fn customer() -> CustomerPrefill {
    CustomerPrefill {
        name: "Asha Rao".to_string(),
        email: "asha@example.com".to_string(),
        contact: "+911234567890".to_string(),
    }
}

async fn orchestrator(
    store: &FakeStore,
    gateway: Arc<ScriptedGateway>,
) -> RetryPaymentOrchestrator {
    let config = store.config();
    let api = StoreApiClient::new(&config).expect("build api client");
    RetryPaymentOrchestrator::new(api, gateway, &config)
}

#[tokio::test]
async fn test_retry_payment_completes_and_verifies() {
    let store = FakeStore::spawn().await;
    let gateway = ScriptedGateway::new(GatewayScript::Complete);
    let orchestrator = orchestrator(&store, Arc::clone(&gateway)).await;

    let attempt = orchestrator
        .retry_payment(&OrderId::new("ord_42"), &customer())
        .await;

    let PaymentAttempt::Completed(payment) = attempt else {
        panic!("expected completed attempt, got {attempt:?}");
    };
    assert_eq!(payment.gateway_order_id, "order_retry_ord_42");

    assert_eq!(store.retry_payment_calls(), 1);
    assert_eq!(store.verify_calls(), 1);
    // The retry flow never re-runs the stock gate.
    assert_eq!(store.stock_calls(), 0);
    assert!(!orchestrator.is_processing());
}

#[tokio::test]
async fn test_retry_tags_payment_with_order_note() {
    let store = FakeStore::spawn().await;
    let gateway = ScriptedGateway::new(GatewayScript::Complete);
    let orchestrator = orchestrator(&store, Arc::clone(&gateway)).await;

    orchestrator
        .retry_payment(&OrderId::new("ord_42"), &customer())
        .await;

    let options = gateway.last_options().expect("modal was opened");
    assert_eq!(options.order_id, "order_retry_ord_42");
    assert!(
        options
            .notes
            .iter()
            .any(|(k, v)| k == "order_id" && v == "ord_42")
    );
}

#[tokio::test]
async fn test_retry_dismissal_leaves_order_retryable() {
    let store = FakeStore::spawn().await;
    let gateway = ScriptedGateway::new(GatewayScript::Dismiss);
    let orchestrator = orchestrator(&store, Arc::clone(&gateway)).await;

    let attempt = orchestrator
        .retry_payment(&OrderId::new("ord_42"), &customer())
        .await;

    let PaymentAttempt::Failed(err) = attempt else {
        panic!("expected failed attempt, got {attempt:?}");
    };
    assert_eq!(err.code, PaymentErrorCode::PaymentModalClosed);
    assert_eq!(store.verify_calls(), 0);

    // The order still reports a live retry window for the failure screen.
    let config = store.config();
    let api = StoreApiClient::new(&config).expect("build api client");
    let order = api.get_order(&OrderId::new("ord_42")).await.expect("fetch order");
    assert!(order.can_retry_payment(chrono::Utc::now()));
}

#[tokio::test]
async fn test_retry_verification_rejection_fails_attempt() {
    let store = FakeStore::spawn().await;
    store.reject_verification("Signature mismatch");
    let gateway = ScriptedGateway::new(GatewayScript::Complete);
    let orchestrator = orchestrator(&store, Arc::clone(&gateway)).await;

    let attempt = orchestrator
        .retry_payment(&OrderId::new("ord_42"), &customer())
        .await;

    let PaymentAttempt::Failed(err) = attempt else {
        panic!("expected failed attempt, got {attempt:?}");
    };
    assert_eq!(err.code, PaymentErrorCode::VerificationFailed);
    assert!(err.description.contains("Signature mismatch"));
}
