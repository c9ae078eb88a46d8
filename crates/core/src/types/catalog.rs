//! Catalog types: products, variants, and time-bounded offers.
//!
//! The catalog is mutated only by the remote service; the client treats these
//! as read-only snapshots (the `stock` field is the last-known value and may
//! be stale relative to the server).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::id::{ProductId, VariantId};

/// The slice of a product the cart needs: identity and display data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub image_url: Option<String>,
}

/// A purchasable variant of a product (one size).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: VariantId,
    pub size: String,
    /// Base price in the currency's standard unit.
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    /// The variant's own markdown, 0-100.
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_percent: Decimal,
    /// Last-known stock snapshot.
    pub stock: u32,
}

/// A time-bounded discount attached to a product or category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub is_active: bool,
    /// Discount percentage, 0-100.
    #[serde(with = "rust_decimal::serde::float")]
    pub percentage: Decimal,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

impl Offer {
    /// Whether the offer applies at `now`: flagged active and inside its window.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.start_date <= now && now <= self.end_date
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn offer(is_active: bool, start_offset_days: i64, end_offset_days: i64) -> Offer {
        let now = Utc::now();
        Offer {
            is_active,
            percentage: Decimal::new(20, 0),
            start_date: now + Duration::days(start_offset_days),
            end_date: now + Duration::days(end_offset_days),
        }
    }

    #[test]
    fn test_offer_live_inside_window() {
        assert!(offer(true, -1, 1).is_live(Utc::now()));
    }

    #[test]
    fn test_offer_inactive_flag_wins() {
        assert!(!offer(false, -1, 1).is_live(Utc::now()));
    }

    #[test]
    fn test_offer_outside_window() {
        assert!(!offer(true, 1, 2).is_live(Utc::now()));
        assert!(!offer(true, -2, -1).is_live(Utc::now()));
    }
}
