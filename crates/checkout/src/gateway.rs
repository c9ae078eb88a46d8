//! Payment gateway abstraction.
//!
//! The vendor ships its checkout as a modal with a callback API; this trait
//! is the contract surface the orchestrators depend on, so their logic (the
//! timeout race, the single-in-flight guard, verification routing) is
//! testable without the vendor runtime. Embedders bridge this trait to the
//! real modal; tests inject a scripted implementation.

use async_trait::async_trait;

/// Options handed to the gateway when opening its checkout.
///
/// Mirrors the vendor constructor surface: `{key, amount, currency,
/// order_id, prefill, notes}`.
#[derive(Debug, Clone)]
pub struct CheckoutOptions {
    /// Gateway publishable key id.
    pub key: String,
    /// Amount in the smallest currency unit.
    pub amount_minor: i64,
    /// ISO 4217 currency code, as the backend returned it.
    pub currency: String,
    /// The server-created gateway order this attempt pays.
    pub order_id: String,
    /// Prefilled customer data for the modal.
    pub prefill: CustomerPrefill,
    /// Free-form key/value notes attached to the payment.
    pub notes: Vec<(String, String)>,
}

/// Customer data prefilled into the gateway modal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomerPrefill {
    pub name: String,
    pub email: String,
    pub contact: String,
}

/// A completed gateway payment, as reported by the modal's success handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPayment {
    pub payment_id: String,
    pub order_id: String,
    pub signature: String,
}

/// A failure reported by the gateway itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayFailure {
    /// The gateway's own error code, passed through unmodified.
    pub code: String,
    pub description: String,
    pub payment_id: Option<String>,
}

/// Terminal outcome of one modal lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    /// The user completed payment; still unverified at this point.
    Completed(GatewayPayment),
    /// The user closed the modal without completing payment.
    Dismissed,
    /// The gateway reported a failure.
    Failed(GatewayFailure),
}

/// The seam to the vendor's checkout runtime.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Make the gateway runtime available (the script-load analogue).
    /// Idempotent; `false` is fatal for the current attempt.
    async fn ensure_ready(&self) -> bool;

    /// Open the checkout for `options` and resolve with its terminal outcome.
    /// Cancelling the returned future abandons the attempt client-side.
    async fn open(&self, options: CheckoutOptions) -> GatewayOutcome;

    /// Force-close an open checkout (used when the client-side timeout fires).
    async fn close(&self);
}
