//! Normalized payment attempt errors.
//!
//! Every failure channel of a payment attempt (stock check, gateway
//! initialization, a dismissed modal, the client-side timeout,
//! gateway-reported failures, post-success verification rejection) is
//! normalized into one [`PaymentAttemptError`] shape with a stable code, so
//! the failure screen has exactly one contract to render.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::InvalidItem;

/// Stable error codes for payment attempt failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentErrorCode {
    /// One or more items are no longer purchasable; payment never started.
    StockError,
    /// The gateway failed to load or the server-side payment order could not
    /// be created.
    InitializationFailed,
    /// The user closed the modal without completing payment. Not a billing
    /// event.
    PaymentModalClosed,
    /// No terminal outcome within the client-side cap; the modal was
    /// force-closed. The order may still need server-side reconciliation.
    PaymentTimeout,
    /// The gateway reported a failure; its own code travels in the metadata.
    PaymentFailed,
    /// The gateway reported success but server-side verification rejected the
    /// payment. Never credited.
    VerificationFailed,
}

impl PaymentErrorCode {
    /// The wire representation of the code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StockError => "STOCK_ERROR",
            Self::InitializationFailed => "INITIALIZATION_FAILED",
            Self::PaymentModalClosed => "PAYMENT_MODAL_CLOSED",
            Self::PaymentTimeout => "PAYMENT_TIMEOUT",
            Self::PaymentFailed => "PAYMENT_FAILED",
            Self::VerificationFailed => "VERIFICATION_FAILED",
        }
    }
}

impl std::fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Context attached to a payment attempt failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentErrorMetadata {
    /// Gateway order id, once one was created.
    #[serde(default)]
    pub order_id: Option<String>,
    /// Gateway payment id, once the modal produced one.
    #[serde(default)]
    pub payment_id: Option<String>,
    /// The gateway's own failure code, passed through unmodified.
    #[serde(default)]
    pub gateway_code: Option<String>,
    /// Unpurchasable items reported by the stock check.
    #[serde(default)]
    pub invalid_items: Vec<InvalidItem>,
}

/// A normalized payment attempt failure: `{code, description, metadata}`.
///
/// Constructed fresh per failure, never persisted.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{code}: {description}")]
pub struct PaymentAttemptError {
    pub code: PaymentErrorCode,
    pub description: String,
    #[serde(default)]
    pub metadata: PaymentErrorMetadata,
}

impl PaymentAttemptError {
    /// Create an error with empty metadata.
    #[must_use]
    pub fn new(code: PaymentErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
            metadata: PaymentErrorMetadata::default(),
        }
    }

    /// Attach the gateway order id.
    #[must_use]
    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.metadata.order_id = Some(order_id.into());
        self
    }

    /// Attach the gateway payment id.
    #[must_use]
    pub fn with_payment_id(mut self, payment_id: impl Into<String>) -> Self {
        self.metadata.payment_id = Some(payment_id.into());
        self
    }

    /// Attach the gateway's own failure code.
    #[must_use]
    pub fn with_gateway_code(mut self, gateway_code: impl Into<String>) -> Self {
        self.metadata.gateway_code = Some(gateway_code.into());
        self
    }

    /// Attach the unpurchasable items from a stock check.
    #[must_use]
    pub fn with_invalid_items(mut self, invalid_items: Vec<InvalidItem>) -> Self {
        self.metadata.invalid_items = invalid_items;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_display_matches_wire_casing() {
        assert_eq!(PaymentErrorCode::StockError.to_string(), "STOCK_ERROR");
        assert_eq!(
            PaymentErrorCode::PaymentModalClosed.to_string(),
            "PAYMENT_MODAL_CLOSED"
        );
        let json = serde_json::to_string(&PaymentErrorCode::PaymentTimeout).unwrap();
        assert_eq!(json, "\"PAYMENT_TIMEOUT\"");
    }

    #[test]
    fn test_attempt_error_display() {
        let err = PaymentAttemptError::new(
            PaymentErrorCode::InitializationFailed,
            "payment gateway failed to load",
        );
        assert_eq!(
            err.to_string(),
            "INITIALIZATION_FAILED: payment gateway failed to load"
        );
    }

    #[test]
    fn test_builder_attaches_metadata() {
        let err = PaymentAttemptError::new(PaymentErrorCode::PaymentFailed, "declined")
            .with_order_id("order_1")
            .with_payment_id("pay_1")
            .with_gateway_code("BAD_REQUEST_ERROR");
        assert_eq!(err.metadata.order_id.as_deref(), Some("order_1"));
        assert_eq!(err.metadata.payment_id.as_deref(), Some("pay_1"));
        assert_eq!(err.metadata.gateway_code.as_deref(), Some("BAD_REQUEST_ERROR"));
    }
}
