//! Core types for Marigold.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod cart;
pub mod catalog;
pub mod coupon;
pub mod id;
pub mod order;
pub mod price;
pub mod status;

pub use cart::CartLineItem;
pub use catalog::{Offer, ProductSummary, Variant};
pub use coupon::{AppliedCoupon, Coupon};
pub use id::*;
pub use order::{Order, OrderItem, ShippingAddress};
pub use price::{CurrencyCode, Price};
pub use status::*;
