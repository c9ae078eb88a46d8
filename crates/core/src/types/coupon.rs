//! Coupon types.
//!
//! The server is authoritative on coupon eligibility (minimum purchase,
//! expiry, usage limits); these types only mirror what it reports.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::id::CouponId;

/// A coupon as listed by the backend's available-coupons endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_percent: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub min_purchase: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub max_discount: Decimal,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

/// A coupon successfully validated against the current cart subtotal.
///
/// At most one is applied per cart. A copy restored from durable client
/// storage after a reload carries only the code and discount amount; the
/// eligibility bounds stay `None` until the next explicit validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCoupon {
    pub code: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_amount: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub min_purchase: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub max_discount: Option<Decimal>,
}
