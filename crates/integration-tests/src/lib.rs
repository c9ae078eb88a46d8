//! Test harness for the checkout crate.
//!
//! [`FakeStore`] runs the store backend's REST surface in-process on an
//! ephemeral port, with per-endpoint call counters and scriptable failure
//! behaviors. [`ScriptedGateway`] implements the payment gateway seam with a
//! fixed outcome per instance, so the orchestrators' timeout, dismissal, and
//! re-entrancy behavior can be exercised without the vendor runtime.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use serde_json::{Value, json};
use tokio::sync::Notify;

use marigold_checkout::config::CheckoutConfig;
use marigold_checkout::gateway::{
    CheckoutOptions, GatewayFailure, GatewayOutcome, GatewayPayment, PaymentGateway,
};

// =============================================================================
// Fake store backend
// =============================================================================

#[derive(Default)]
struct StoreState {
    stock_calls: AtomicUsize,
    create_payment_calls: AtomicUsize,
    verify_calls: AtomicUsize,
    retry_payment_calls: AtomicUsize,
    clear_cart_calls: AtomicUsize,

    invalid_items: Mutex<Vec<Value>>,
    verification_rejection: Mutex<Option<String>>,
    fail_clear_cart: AtomicBool,
    cart_items: Mutex<Vec<Value>>,
    coupons: Mutex<Vec<Value>>,
}

/// An in-process store backend bound to an ephemeral local port.
///
/// Handlers mirror the real backend's wire contract: camelCase JSON bodies,
/// error responses of the shape `{"message": ...}`, and coupon validation
/// that enforces a minimum purchase of 1000.
pub struct FakeStore {
    base_url: String,
    state: Arc<StoreState>,
}

/// Install a test-writer subscriber once per process so `RUST_LOG` works in
/// test runs.
fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

impl FakeStore {
    /// Bind and serve the fake backend. The server task is detached; it lives
    /// for the rest of the test process.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn spawn() -> Self {
        init_tracing();
        let state = Arc::new(StoreState::default());

        let app = Router::new()
            .route("/validate-stock", post(validate_stock))
            .route("/create-payment", post(create_payment))
            .route("/verify-payment", post(verify_payment))
            .route("/orders/{id}/retry-payment", post(create_retry_payment))
            .route("/orders/{id}/verify-retry-payment", post(verify_retry_payment))
            .route("/orders/{id}", get(get_order))
            .route("/cart/{user_id}", get(fetch_cart))
            .route("/cart/clear/{user_id}", delete(clear_cart))
            .route("/coupons", get(list_coupons))
            .route("/coupons/validate", post(validate_coupon))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake store listener");
        let addr = listener.local_addr().expect("fake store local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve fake store");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    /// A checkout configuration pointed at this fake backend, with the
    /// production five-minute timeout (tests override it where they need to).
    ///
    /// # Panics
    ///
    /// Panics if the bound address does not parse as a URL.
    #[must_use]
    pub fn config(&self) -> CheckoutConfig {
        CheckoutConfig {
            api_base_url: self.base_url.parse().expect("fake store base url"),
            gateway_key_id: "rzp_test_key".to_string(),
            payment_timeout: Duration::from_secs(300),
            coupon_cache_ttl: Duration::from_secs(300),
        }
    }

    // -- scripted behaviors ---------------------------------------------------

    /// Make the next stock checks report these items as unpurchasable.
    pub fn set_invalid_items(&self, items: Vec<Value>) {
        *self.state.invalid_items.lock().expect("lock") = items;
    }

    /// Make payment verification reject with `message`.
    pub fn reject_verification(&self, message: &str) {
        *self.state.verification_rejection.lock().expect("lock") = Some(message.to_string());
    }

    /// Make cart-clear requests fail with a 500.
    pub fn fail_clear_cart(&self) {
        self.state.fail_clear_cart.store(true, Ordering::Release);
    }

    /// Set the server-side cart contents returned by cart fetches.
    pub fn set_cart_items(&self, items: Vec<Value>) {
        *self.state.cart_items.lock().expect("lock") = items;
    }

    /// Set the available-coupons listing.
    pub fn set_coupons(&self, coupons: Vec<Value>) {
        *self.state.coupons.lock().expect("lock") = coupons;
    }

    // -- call counters --------------------------------------------------------

    #[must_use]
    pub fn stock_calls(&self) -> usize {
        self.state.stock_calls.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn create_payment_calls(&self) -> usize {
        self.state.create_payment_calls.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn verify_calls(&self) -> usize {
        self.state.verify_calls.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn retry_payment_calls(&self) -> usize {
        self.state.retry_payment_calls.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn clear_cart_calls(&self) -> usize {
        self.state.clear_cart_calls.load(Ordering::Acquire)
    }
}

async fn validate_stock(State(state): State<Arc<StoreState>>) -> Json<Value> {
    state.stock_calls.fetch_add(1, Ordering::AcqRel);
    let invalid = state.invalid_items.lock().expect("lock").clone();
    if invalid.is_empty() {
        Json(json!({ "valid": true }))
    } else {
        Json(json!({ "valid": false, "invalidItems": invalid }))
    }
}

async fn create_payment(
    State(state): State<Arc<StoreState>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.create_payment_calls.fetch_add(1, Ordering::AcqRel);
    let amount = body.get("amount").and_then(Value::as_i64).unwrap_or(0);
    Json(json!({
        "orderId": "order_test_1",
        "amount": amount,
        "currency": "INR",
    }))
}

fn verification_response(state: &StoreState) -> Json<Value> {
    state.verify_calls.fetch_add(1, Ordering::AcqRel);
    let rejection = state.verification_rejection.lock().expect("lock").clone();
    match rejection {
        Some(message) => Json(json!({ "verified": false, "message": message })),
        None => Json(json!({ "verified": true })),
    }
}

async fn verify_payment(State(state): State<Arc<StoreState>>) -> Json<Value> {
    verification_response(&state)
}

async fn verify_retry_payment(
    State(state): State<Arc<StoreState>>,
    Path(_id): Path<String>,
) -> Json<Value> {
    verification_response(&state)
}

async fn create_retry_payment(
    State(state): State<Arc<StoreState>>,
    Path(id): Path<String>,
) -> Json<Value> {
    state.retry_payment_calls.fetch_add(1, Ordering::AcqRel);
    Json(json!({
        "orderId": format!("order_retry_{id}"),
        "amount": 50000,
        "currency": "INR",
    }))
}

async fn get_order(Path(id): Path<String>) -> Json<Value> {
    Json(json!({
        "id": id,
        "orderNumber": "MG-1001",
        "status": "PENDING",
        "paymentStatus": "failed",
        "paymentRetryWindow": "2099-01-01T00:00:00Z",
        "totalAmount": 500.0,
        "items": [],
        "shippingAddress": {
            "name": "Asha Rao",
            "phone": "+911234567890",
            "addressLine": "12 Lake View Road",
            "city": "Bengaluru",
            "state": "Karnataka",
            "postalCode": "560001",
        },
    }))
}

async fn fetch_cart(State(state): State<Arc<StoreState>>) -> Json<Value> {
    let items = state.cart_items.lock().expect("lock").clone();
    Json(json!({ "items": items }))
}

async fn clear_cart(State(state): State<Arc<StoreState>>) -> Response {
    state.clear_cart_calls.fetch_add(1, Ordering::AcqRel);
    if state.fail_clear_cart.load(Ordering::Acquire) {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": "Failed to clear cart" })),
        )
            .into_response()
    } else {
        Json(json!({ "success": true })).into_response()
    }
}

async fn list_coupons(State(state): State<Arc<StoreState>>) -> Json<Value> {
    let coupons = state.coupons.lock().expect("lock").clone();
    Json(Value::Array(coupons))
}

async fn validate_coupon(Json(body): Json<Value>) -> Response {
    let cart_total = body.get("cartTotal").and_then(Value::as_f64).unwrap_or(0.0);
    let code = body
        .get("code")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if cart_total < 1000.0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Minimum purchase of ₹1000 required for this coupon" })),
        )
            .into_response();
    }

    Json(json!({
        "code": code,
        "discountAmount": 100.0,
        "minPurchase": 1000.0,
        "maxDiscount": 500.0,
    }))
    .into_response()
}

// =============================================================================
// Scripted gateway
// =============================================================================

/// What a [`ScriptedGateway`] does when its checkout is opened.
#[derive(Debug, Clone)]
pub enum GatewayScript {
    /// Resolve immediately with a completed payment.
    Complete,
    /// Resolve immediately as dismissed by the user.
    Dismiss,
    /// Resolve immediately with a gateway-reported failure.
    Fail { code: String, description: String },
    /// Never resolve (drives the client-side timeout).
    Hang,
    /// Block until [`ScriptedGateway::release`], then complete. Used to hold
    /// an attempt in flight while another call races it.
    HoldUntilReleased,
}

/// A [`PaymentGateway`] with one scripted outcome and call accounting.
pub struct ScriptedGateway {
    script: GatewayScript,
    ready: bool,
    release: Notify,
    open_calls: AtomicUsize,
    close_calls: AtomicUsize,
    last_options: Mutex<Option<CheckoutOptions>>,
}

impl ScriptedGateway {
    #[must_use]
    pub fn new(script: GatewayScript) -> Arc<Self> {
        Arc::new(Self {
            script,
            ready: true,
            release: Notify::new(),
            open_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        })
    }

    /// A gateway whose runtime never becomes ready.
    #[must_use]
    pub fn unready() -> Arc<Self> {
        Arc::new(Self {
            script: GatewayScript::Complete,
            ready: false,
            release: Notify::new(),
            open_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            last_options: Mutex::new(None),
        })
    }

    /// Unblock a [`GatewayScript::HoldUntilReleased`] checkout.
    pub fn release(&self) {
        self.release.notify_one();
    }

    #[must_use]
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::Acquire)
    }

    /// The options of the most recent `open` call.
    #[must_use]
    pub fn last_options(&self) -> Option<CheckoutOptions> {
        self.last_options.lock().expect("lock").clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn ensure_ready(&self) -> bool {
        self.ready
    }

    async fn open(&self, options: CheckoutOptions) -> GatewayOutcome {
        self.open_calls.fetch_add(1, Ordering::AcqRel);
        let order_id = options.order_id.clone();
        *self.last_options.lock().expect("lock") = Some(options);

        match &self.script {
            GatewayScript::Complete => GatewayOutcome::Completed(GatewayPayment {
                payment_id: "pay_test_1".to_string(),
                order_id,
                signature: "sig_test".to_string(),
            }),
            GatewayScript::Dismiss => GatewayOutcome::Dismissed,
            GatewayScript::Fail { code, description } => {
                GatewayOutcome::Failed(GatewayFailure {
                    code: code.clone(),
                    description: description.clone(),
                    payment_id: Some("pay_test_1".to_string()),
                })
            }
            GatewayScript::Hang => std::future::pending().await,
            GatewayScript::HoldUntilReleased => {
                self.release.notified().await;
                GatewayOutcome::Completed(GatewayPayment {
                    payment_id: "pay_test_1".to_string(),
                    order_id,
                    signature: "sig_test".to_string(),
                })
            }
        }
    }

    async fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::AcqRel);
    }
}
