//! Marigold Core - Shared types library.
//!
//! This crate provides common types used across all Marigold components:
//! - `checkout` - Cart, coupon, and payment orchestration library
//! - `integration-tests` - End-to-end tests against a fake backend
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, prices, statuses, and catalog/cart/order types
//! - [`pricing`] - Effective-price computation for discounted variants

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use types::*;
