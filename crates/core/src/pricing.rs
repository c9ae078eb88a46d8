//! Effective-price computation for discounted variants.
//!
//! A variant carries its own markdown; a product or its category may also
//! carry a time-bounded [`Offer`]. The two discounts stack multiplicatively:
//!
//! ```text
//! final = price × (1 − variant% / 100) × (1 − offer% / 100)
//! ```
//!
//! Inputs are not validated (negative prices or discounts above 100 are the
//! caller's responsibility); these functions only compute.

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::catalog::{Offer, Variant};

/// The variant's effective sale price at `now`, rounded to 2 decimal places
/// (midpoint away from zero, not truncation).
///
/// The variant's own discount applies first, then the offer if it is live at
/// `now`. With no live offer this reduces to the single-discount case.
#[must_use]
pub fn effective_price_at(variant: &Variant, offer: Option<&Offer>, now: DateTime<Utc>) -> Decimal {
    let mut price = variant.price * discount_factor(variant.discount_percent);
    if let Some(offer) = offer.filter(|o| o.is_live(now)) {
        price *= discount_factor(offer.percentage);
    }
    price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// [`effective_price_at`] evaluated at the current time.
#[must_use]
pub fn effective_price(variant: &Variant, offer: Option<&Offer>) -> Decimal {
    effective_price_at(variant, offer, Utc::now())
}

/// The percentage shown on the discount badge: the two percentages summed.
///
/// This is presentation text only. It diverges from the multiplicative price
/// math once both discounts are non-trivial (10% + 20% displays "30" while
/// the true combined discount is 28%), so it must never feed monetary
/// calculations. Use [`effective_price_at`] for those.
#[must_use]
pub fn display_discount_percent_at(
    variant: &Variant,
    offer: Option<&Offer>,
    now: DateTime<Utc>,
) -> Decimal {
    let offer_percent = offer
        .filter(|o| o.is_live(now))
        .map_or(Decimal::ZERO, |o| o.percentage);
    variant.discount_percent + offer_percent
}

/// [`display_discount_percent_at`] evaluated at the current time.
#[must_use]
pub fn display_discount_percent(variant: &Variant, offer: Option<&Offer>) -> Decimal {
    display_discount_percent_at(variant, offer, Utc::now())
}

fn discount_factor(percent: Decimal) -> Decimal {
    (Decimal::ONE_HUNDRED - percent) / Decimal::ONE_HUNDRED
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::id::VariantId;
    use chrono::Duration;

    fn variant(price: i64, discount_percent: i64) -> Variant {
        Variant {
            id: VariantId::new("v1"),
            size: "M".to_string(),
            price: Decimal::new(price, 0),
            discount_percent: Decimal::new(discount_percent, 0),
            stock: 10,
        }
    }

    fn live_offer(percentage: i64) -> Offer {
        let now = Utc::now();
        Offer {
            is_active: true,
            percentage: Decimal::new(percentage, 0),
            start_date: now - Duration::days(1),
            end_date: now + Duration::days(1),
        }
    }

    #[test]
    fn test_effective_price_stacks_multiplicatively() {
        // 1000 × 0.9 × 0.8 = 720.00
        let price = effective_price(&variant(1000, 10), Some(&live_offer(20)));
        assert_eq!(price, Decimal::new(72000, 2));
    }

    #[test]
    fn test_effective_price_single_discount() {
        let price = effective_price(&variant(1000, 10), None);
        assert_eq!(price, Decimal::new(90000, 2));
    }

    #[test]
    fn test_effective_price_ignores_expired_offer() {
        let now = Utc::now();
        let expired = Offer {
            is_active: true,
            percentage: Decimal::new(20, 0),
            start_date: now - Duration::days(2),
            end_date: now - Duration::days(1),
        };
        let price = effective_price_at(&variant(1000, 10), Some(&expired), now);
        assert_eq!(price, Decimal::new(90000, 2));
    }

    #[test]
    fn test_effective_price_rounds_to_two_places() {
        // 999 × 0.85 × 0.93 = 789.6595 -> 789.66
        let price = effective_price(&variant(999, 15), Some(&live_offer(7)));
        assert_eq!(price, Decimal::new(78966, 2));
    }

    #[test]
    fn test_display_discount_sums_not_compounds() {
        // 10% + 20% displays as 30, even though the true combined discount is 28%
        let percent = display_discount_percent(&variant(1000, 10), Some(&live_offer(20)));
        assert_eq!(percent, Decimal::new(30, 0));
    }

    #[test]
    fn test_display_discount_without_offer() {
        let percent = display_discount_percent(&variant(1000, 10), None);
        assert_eq!(percent, Decimal::new(10, 0));
    }
}
