//! Status enums for orders and payments.
//!
//! Wire casing matches the backend: order statuses travel as
//! `SCREAMING_SNAKE_CASE`, payment statuses as lowercase.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Transitions are server-driven; the client only observes them via refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

/// Payment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Failed,
}
