//! Client-side view of an order.
//!
//! Orders are created server-side at checkout submission. The client only
//! observes status transitions by refetching; the one decision it makes
//! locally is whether the payment-retry action is still on offer.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::id::{OrderId, ProductId, VariantId};
use crate::types::status::{OrderStatus, PaymentStatus};

/// An order as returned by `GET /orders/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// Deadline until which a failed payment may be retried.
    #[serde(default)]
    pub payment_retry_window: Option<DateTime<Utc>>,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    #[serde(default)]
    pub items: Vec<OrderItem>,
    #[serde(default)]
    pub shipping_address: Option<ShippingAddress>,
}

impl Order {
    /// Whether the retry action should be offered: payment failed and the
    /// retry window has not lapsed.
    #[must_use]
    pub fn can_retry_payment(&self, now: DateTime<Utc>) -> bool {
        self.payment_status == PaymentStatus::Failed
            && self.payment_retry_window.is_some_and(|deadline| now <= deadline)
    }
}

/// One purchased line of an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub name: String,
    pub size: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub unit_price: Decimal,
}

/// Shipping destination captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub name: String,
    pub phone: String,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn order(payment_status: PaymentStatus, window: Option<DateTime<Utc>>) -> Order {
        Order {
            id: OrderId::new("ord_1"),
            order_number: "MG-1001".to_string(),
            status: OrderStatus::Pending,
            payment_status,
            payment_retry_window: window,
            total_amount: Decimal::new(72000, 2),
            items: vec![],
            shipping_address: None,
        }
    }

    #[test]
    fn test_can_retry_inside_window() {
        let now = Utc::now();
        let o = order(PaymentStatus::Failed, Some(now + Duration::minutes(10)));
        assert!(o.can_retry_payment(now));
    }

    #[test]
    fn test_cannot_retry_after_window_lapses() {
        let now = Utc::now();
        let o = order(PaymentStatus::Failed, Some(now - Duration::seconds(1)));
        assert!(!o.can_retry_payment(now));
    }

    #[test]
    fn test_cannot_retry_when_paid_or_windowless() {
        let now = Utc::now();
        assert!(!order(PaymentStatus::Paid, Some(now + Duration::minutes(10))).can_retry_payment(now));
        assert!(!order(PaymentStatus::Failed, None).can_retry_payment(now));
    }
}
