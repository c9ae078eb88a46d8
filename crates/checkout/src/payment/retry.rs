//! Retry-payment orchestration for a previously failed order.
//!
//! Same modal lifecycle as the initial flow, but keyed by an existing order:
//! the backend mints a fresh gateway order for the same logical order, and
//! verification goes through the retry endpoints. The stock gate is not
//! re-run; the order already exists and stock was reserved at its creation.
//! Independent in-flight flag and timeout from any [`PaymentOrchestrator`].
//!
//! [`PaymentOrchestrator`]: super::PaymentOrchestrator

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{instrument, warn};

use marigold_core::OrderId;

use crate::api::StoreApiClient;
use crate::config::CheckoutConfig;
use crate::error::{PaymentAttemptError, PaymentErrorCode};
use crate::gateway::{CustomerPrefill, PaymentGateway};

use super::{InFlightGuard, PaymentAttempt, ReadyOrder, build_options, run_modal};

/// Drives one retry attempt for an order whose payment previously failed.
pub struct RetryPaymentOrchestrator {
    api: StoreApiClient,
    gateway: Arc<dyn PaymentGateway>,
    key_id: String,
    timeout: Duration,
    in_flight: AtomicBool,
}

impl RetryPaymentOrchestrator {
    /// Create a retry orchestrator over the given backend client and gateway.
    #[must_use]
    pub fn new(api: StoreApiClient, gateway: Arc<dyn PaymentGateway>, config: &CheckoutConfig) -> Self {
        Self {
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

    /// Whether a retry attempt is currently in flight.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one retry attempt for `order_id`.
    ///
    /// Never panics and never returns a raw transport error; every failure is
    /// normalized into [`PaymentAttempt::Failed`].
    #[instrument(skip(self, customer), fields(order_id = %order_id))]
    pub async fn retry_payment(
        &self,
        order_id: &OrderId,
        customer: &CustomerPrefill,
    ) -> PaymentAttempt {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return PaymentAttempt::AlreadyInFlight;
        }
        let _guard = InFlightGuard(&self.in_flight);

        if !self.gateway.ensure_ready().await {
            warn!("Payment gateway failed to become ready");
            return PaymentAttempt::Failed(PaymentAttemptError::new(
                PaymentErrorCode::InitializationFailed,
                "Payment gateway failed to load",
            ));
        }

        let order = match self.api.create_retry_payment(order_id).await {
            Ok(order) => order,
            Err(e) => {
                warn!(error = %e, "Retry payment order creation failed");
                return PaymentAttempt::Failed(PaymentAttemptError::new(
                    PaymentErrorCode::InitializationFailed,
                    e.to_string(),
                ));
            }
        };
        let order = match ReadyOrder::try_from_response(order) {
            Ok(order) => order,
            Err(err) => return PaymentAttempt::Failed(err),
        };

        let notes = vec![("order_id".to_string(), order_id.to_string())];
        run_modal(
            self.gateway.as_ref(),
            self.timeout,
            build_options(&self.key_id, &order, customer, &notes),
            |verification| async move {
                self.api.verify_retry_payment(order_id, &verification).await
            },
        )
        .await
    }
}
