//! Payment orchestration.
//!
//! One attempt walks `idle → stock check → gateway ready → server payment
//! order → modal open → {completed | dismissed | failed | timed out}` and
//! normalizes every failure channel into a [`PaymentAttemptError`] with a
//! stable code. Nothing escapes the orchestrator as a panic or a raw error;
//! callers match on [`PaymentAttempt`].
//!
//! Only one attempt may be in flight per orchestrator instance. The guard is
//! checked synchronously at entry; a concurrent call returns
//! [`PaymentAttempt::AlreadyInFlight`] without side effects, and the flag is
//! released on every exit path by a drop guard.
//!
//! The modal is raced against a hard client-side timeout with
//! `tokio::time::timeout`, which drops the losing future: a timeout cannot
//! fire after the modal already produced an outcome, and vice versa. On
//! timeout the modal is force-closed before the attempt is reported failed.

pub mod retry;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{instrument, warn};

use marigold_core::Price;

use crate::api::{GatewayOrder, PaymentVerification, StockCheckItem, StoreApiClient};
use crate::config::CheckoutConfig;
use crate::error::{PaymentAttemptError, PaymentErrorCode};
use crate::gateway::{CheckoutOptions, CustomerPrefill, GatewayOutcome, PaymentGateway};
use crate::stock::{StockGateError, StockValidationGate};

pub use retry::RetryPaymentOrchestrator;

/// What one payment attempt needs from the caller.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    /// The order total the server will be asked to create a gateway order for.
    pub amount: Price,
    /// The candidate line items, pre-checked against stock before payment.
    pub items: Vec<StockCheckItem>,
    /// Customer data prefilled into the modal.
    pub customer: CustomerPrefill,
    /// Free-form notes forwarded to the gateway.
    pub notes: Vec<(String, String)>,
}

/// A gateway payment that passed server-side verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedPayment {
    pub gateway_order_id: String,
    pub payment_id: String,
}

/// Terminal result of one payment attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentAttempt {
    /// Payment completed and verified server-side.
    Completed(VerifiedPayment),
    /// Payment did not complete; the error carries a stable code.
    Failed(PaymentAttemptError),
    /// Another attempt was already in flight on this orchestrator; nothing
    /// was done.
    AlreadyInFlight,
}

/// Releases the in-flight flag on every exit path, including early returns.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives one payment attempt end to end against the gateway and backend.
pub struct PaymentOrchestrator {
    api: StoreApiClient,
    stock_gate: StockValidationGate,
    gateway: Arc<dyn PaymentGateway>,
    key_id: String,
    timeout: Duration,
    in_flight: AtomicBool,
}

impl PaymentOrchestrator {
    /// Create an orchestrator over the given backend client and gateway.
    #[must_use]
    pub fn new(api: StoreApiClient, gateway: Arc<dyn PaymentGateway>, config: &CheckoutConfig) -> Self {
        Self {
            stock_gate: StockValidationGate::new(api.clone()),
            api,
            gateway,
            key_id: config.gateway_key_id.clone(),
            timeout: config.payment_timeout,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Override the client-side attempt timeout (tests use short values).
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether an attempt is currently in flight.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one payment attempt.
    ///
    /// Never panics and never returns a raw transport error; every failure is
    /// normalized into [`PaymentAttempt::Failed`].
    #[instrument(skip(self, request))]
    pub async fn initialize_payment(&self, request: &PaymentRequest) -> PaymentAttempt {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return PaymentAttempt::AlreadyInFlight;
        }
        let _guard = InFlightGuard(&self.in_flight);

        // 1. Stock gate: payment never starts against an unpurchasable cart.
        if let Err(e) = self.stock_gate.validate(&request.items).await {
            return PaymentAttempt::Failed(stock_failure(e));
        }

        // 2-4. Shared with the retry flow.
        let order = match self.create_gateway_order(request).await {
            Ok(order) => order,
            Err(failed) => return failed,
        };

        run_modal(
            self.gateway.as_ref(),
            self.timeout,
            build_options(&self.key_id, &order, &request.customer, &request.notes),
            |verification| async move { self.api.verify_payment(&verification).await },
        )
        .await
    }

    async fn create_gateway_order(&self, request: &PaymentRequest) -> Result<ReadyOrder, PaymentAttempt> {
        if !self.gateway.ensure_ready().await {
            warn!("Payment gateway failed to become ready");
            return Err(PaymentAttempt::Failed(PaymentAttemptError::new(
                PaymentErrorCode::InitializationFailed,
                "Payment gateway failed to load",
            )));
        }

        let Some(amount_minor) = request.amount.to_minor_units() else {
            return Err(PaymentAttempt::Failed(PaymentAttemptError::new(
                PaymentErrorCode::InitializationFailed,
                "Order amount is not representable in minor units",
            )));
        };

        let order = match self.api.create_payment(amount_minor).await {
            Ok(order) => order,
            Err(e) => {
                warn!(error = %e, "Payment order creation failed");
                return Err(PaymentAttempt::Failed(PaymentAttemptError::new(
                    PaymentErrorCode::InitializationFailed,
                    e.to_string(),
                )));
            }
        };

        ReadyOrder::try_from_response(order).map_err(PaymentAttempt::Failed)
    }
}

/// A gateway order whose id is known to be present.
pub(crate) struct ReadyOrder {
    pub(crate) order_id: String,
    pub(crate) amount: i64,
    pub(crate) currency: String,
}

impl ReadyOrder {
    pub(crate) fn try_from_response(order: GatewayOrder) -> Result<Self, PaymentAttemptError> {
        let GatewayOrder {
            order_id: Some(order_id),
            amount,
            currency,
        } = order
        else {
            warn!("Payment order response is missing an order id");
            return Err(PaymentAttemptError::new(
                PaymentErrorCode::InitializationFailed,
                "Payment order response is missing an order id",
            ));
        };
        Ok(Self {
            order_id,
            amount,
            currency,
        })
    }
}

pub(crate) fn build_options(
    key_id: &str,
    order: &ReadyOrder,
    customer: &CustomerPrefill,
    notes: &[(String, String)],
) -> CheckoutOptions {
    CheckoutOptions {
        key: key_id.to_string(),
        // The server-returned amount and currency are authoritative for the
        // modal; the client-computed amount was only the creation request.
        amount_minor: order.amount,
        currency: order.currency.clone(),
        order_id: order.order_id.clone(),
        prefill: customer.clone(),
        notes: notes.to_vec(),
    }
}

/// Open the modal, race it against the timeout, and verify a completion
/// server-side before reporting success.
pub(crate) async fn run_modal<F, Fut>(
    gateway: &dyn PaymentGateway,
    timeout: Duration,
    options: CheckoutOptions,
    verify: F,
) -> PaymentAttempt
where
    F: FnOnce(PaymentVerification) -> Fut,
    Fut: std::future::Future<Output = Result<(), crate::api::ApiError>>,
{
    let order_id = options.order_id.clone();

    let outcome = match tokio::time::timeout(timeout, gateway.open(options)).await {
        Ok(outcome) => outcome,
        Err(_elapsed) => {
            // The open() future is dropped; its handlers can no longer fire.
            gateway.close().await;
            warn!(order_id = %order_id, "Payment attempt timed out");
            return PaymentAttempt::Failed(
                PaymentAttemptError::new(
                    PaymentErrorCode::PaymentTimeout,
                    "Payment was not completed within the allowed time",
                )
                .with_order_id(order_id),
            );
        }
    };

    match outcome {
        GatewayOutcome::Dismissed => PaymentAttempt::Failed(
            PaymentAttemptError::new(
                PaymentErrorCode::PaymentModalClosed,
                "Payment was cancelled before completion",
            )
            .with_order_id(order_id),
        ),
        GatewayOutcome::Failed(failure) => {
            warn!(order_id = %order_id, gateway_code = %failure.code, "Gateway reported payment failure");
            let mut err = PaymentAttemptError::new(
                PaymentErrorCode::PaymentFailed,
                failure.description,
            )
            .with_order_id(order_id)
            .with_gateway_code(failure.code);
            if let Some(payment_id) = failure.payment_id {
                err = err.with_payment_id(payment_id);
            }
            PaymentAttempt::Failed(err)
        }
        GatewayOutcome::Completed(payment) => {
            let verification = PaymentVerification {
                razorpay_payment_id: payment.payment_id.clone(),
                razorpay_order_id: payment.order_id.clone(),
                razorpay_signature: payment.signature,
            };
            match verify(verification).await {
                Ok(()) => PaymentAttempt::Completed(VerifiedPayment {
                    gateway_order_id: payment.order_id,
                    payment_id: payment.payment_id,
                }),
                Err(e) => {
                    // The gateway said success but the backend did not agree;
                    // this must never be credited.
                    warn!(order_id = %payment.order_id, error = %e, "Payment verification rejected");
                    PaymentAttempt::Failed(
                        PaymentAttemptError::new(PaymentErrorCode::VerificationFailed, e.to_string())
                            .with_order_id(payment.order_id)
                            .with_payment_id(payment.payment_id),
                    )
                }
            }
        }
    }
}

fn stock_failure(error: StockGateError) -> PaymentAttemptError {
    match error {
        StockGateError::Unpurchasable(stock) => {
            PaymentAttemptError::new(PaymentErrorCode::StockError, stock.message)
                .with_invalid_items(stock.invalid_items)
        }
        StockGateError::Unavailable(_) => PaymentAttemptError::new(
            PaymentErrorCode::StockError,
            "Unable to verify stock availability",
        ),
    }
}
