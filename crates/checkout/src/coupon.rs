//! Coupon listing, validation, and applied-coupon tracking.
//!
//! The server is the source of truth on eligibility (minimum purchase,
//! expiry, usage limits); this engine only tracks the at-most-one applied
//! coupon, persists its `{code, discountAmount}` copy so a reload does not
//! silently drop an applied discount, and recomputes the order total.
//!
//! The applied coupon is not re-validated automatically when the subtotal
//! changes afterwards; the server re-checks at order submission.

use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use marigold_core::{AppliedCoupon, Coupon};

use crate::api::{ApiError, StoreApiClient};
use crate::storage::{CheckoutStorage, keys};

/// The durable copy of an applied coupon: just enough to survive a reload
/// until the next explicit validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedCoupon {
    code: String,
    #[serde(with = "rust_decimal::serde::float")]
    discount_amount: Decimal,
}

/// Tracks at most one applied coupon per cart.
pub struct CouponEngine {
    api: StoreApiClient,
    storage: Arc<dyn CheckoutStorage>,
    applied: Option<AppliedCoupon>,
}

impl CouponEngine {
    /// Create an engine, restoring a persisted applied coupon if one exists.
    ///
    /// A restored coupon carries only `{code, discount_amount}`; its
    /// eligibility bounds stay `None` until the next explicit [`apply`].
    ///
    /// [`apply`]: Self::apply
    #[must_use]
    pub fn new(api: StoreApiClient, storage: Arc<dyn CheckoutStorage>) -> Self {
        let applied = storage
            .read(keys::APPLIED_COUPON)
            .and_then(|json| match serde_json::from_str::<PersistedCoupon>(&json) {
                Ok(persisted) => Some(AppliedCoupon {
                    code: persisted.code,
                    discount_amount: persisted.discount_amount,
                    min_purchase: None,
                    max_discount: None,
                }),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable persisted coupon");
                    None
                }
            });

        Self {
            api,
            storage,
            applied,
        }
    }

    /// List the currently valid coupons (cached by the API client).
    ///
    /// # Errors
    ///
    /// Returns the fetch failure; callers surface it as a loading-state
    /// failure, not fatal.
    pub async fn available(&self) -> Result<Vec<Coupon>, ApiError> {
        self.api.available_coupons().await
    }

    /// Validate `code` against the current subtotal and apply it.
    ///
    /// A success replaces any previously applied coupon (never stacks) and
    /// persists the durable copy. A rejection leaves the existing applied
    /// coupon untouched and carries the server's message verbatim.
    ///
    /// # Errors
    ///
    /// Returns the server rejection or transport failure.
    #[instrument(skip(self, subtotal), fields(code = %code))]
    pub async fn apply(&mut self, code: &str, subtotal: Decimal) -> Result<AppliedCoupon, ApiError> {
        let coupon = self.api.validate_coupon(code, subtotal).await?;

        self.persist(&coupon);
        self.applied = Some(coupon.clone());
        Ok(coupon)
    }

    /// Remove the applied coupon and its durable copy.
    pub fn remove(&mut self) {
        self.applied = None;
        self.storage.remove(keys::APPLIED_COUPON);
    }

    /// The currently applied coupon, if any.
    #[must_use]
    pub const fn applied(&self) -> Option<&AppliedCoupon> {
        self.applied.as_ref()
    }

    /// Order total with the applied discount taken off:
    /// `subtotal + shipping + cod_fee − discount`, floored at zero.
    #[must_use]
    pub fn order_total(&self, subtotal: Decimal, shipping: Decimal, cod_fee: Decimal) -> Decimal {
        let discount = self
            .applied
            .as_ref()
            .map_or(Decimal::ZERO, |coupon| coupon.discount_amount);
        (subtotal + shipping + cod_fee - discount).max(Decimal::ZERO)
    }

    fn persist(&self, coupon: &AppliedCoupon) {
        let persisted = PersistedCoupon {
            code: coupon.code.clone(),
            discount_amount: coupon.discount_amount,
        };
        match serde_json::to_string(&persisted) {
            Ok(json) => self.storage.write(keys::APPLIED_COUPON, &json),
            Err(e) => warn!(error = %e, "Failed to serialize coupon for persistence"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CheckoutConfig;
    use crate::storage::MemoryStorage;
    use std::time::Duration;

    fn api() -> StoreApiClient {
        // Never actually dialed in these tests.
        let config = CheckoutConfig {
            api_base_url: "http://localhost:9".parse().unwrap(),
            gateway_key_id: "rzp_test_key".to_string(),
            payment_timeout: Duration::from_secs(300),
            coupon_cache_ttl: Duration::from_secs(300),
        };
        StoreApiClient::new(&config).unwrap()
    }

    fn applied(code: &str, discount: i64) -> AppliedCoupon {
        AppliedCoupon {
            code: code.to_string(),
            discount_amount: Decimal::new(discount, 0),
            min_purchase: Some(Decimal::new(1000, 0)),
            max_discount: Some(Decimal::new(500, 0)),
        }
    }

    #[test]
    fn test_order_total_without_coupon() {
        let engine = CouponEngine::new(api(), Arc::new(MemoryStorage::new()));
        let total = engine.order_total(
            Decimal::new(900, 0),
            Decimal::new(50, 0),
            Decimal::new(30, 0),
        );
        assert_eq!(total, Decimal::new(980, 0));
    }

    #[test]
    fn test_order_total_subtracts_discount_and_floors_at_zero() {
        let storage = Arc::new(MemoryStorage::new());
        let mut engine = CouponEngine::new(api(), Arc::clone(&storage) as Arc<dyn CheckoutStorage>);
        engine.applied = Some(applied("SAVE100", 100));
        assert_eq!(
            engine.order_total(Decimal::new(900, 0), Decimal::ZERO, Decimal::ZERO),
            Decimal::new(800, 0)
        );

        engine.applied = Some(applied("HUGE", 5000));
        assert_eq!(
            engine.order_total(Decimal::new(900, 0), Decimal::ZERO, Decimal::ZERO),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_persisted_coupon_survives_reload() {
        let storage = Arc::new(MemoryStorage::new());
        {
            let engine = CouponEngine::new(api(), Arc::clone(&storage) as Arc<dyn CheckoutStorage>);
            engine.persist(&applied("FESTIVE10", 72));
        }

        let reloaded = CouponEngine::new(api(), storage);
        let coupon = reloaded.applied().expect("restored from storage");
        assert_eq!(coupon.code, "FESTIVE10");
        assert_eq!(coupon.discount_amount, Decimal::new(72, 0));
        // Eligibility bounds are unknown until the next explicit validation.
        assert_eq!(coupon.min_purchase, None);
        assert_eq!(coupon.max_discount, None);
    }

    #[test]
    fn test_remove_clears_durable_copy() {
        let storage = Arc::new(MemoryStorage::new());
        let mut engine = CouponEngine::new(api(), Arc::clone(&storage) as Arc<dyn CheckoutStorage>);
        engine.persist(&applied("FESTIVE10", 72));
        engine.applied = Some(applied("FESTIVE10", 72));

        engine.remove();
        assert!(engine.applied().is_none());

        let reloaded = CouponEngine::new(api(), storage);
        assert!(reloaded.applied().is_none());
    }
}
