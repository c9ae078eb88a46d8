//! Marigold Checkout library.
//!
//! Client-side checkout core for the Marigold storefront: cart state, coupon
//! application, pre-payment stock validation, and orchestration of the
//! third-party payment gateway (including the bounded-time retry flow for
//! failed orders).
//!
//! Nearly all business logic (pricing authority, stock decrement, order
//! lifecycle, payment verification) lives server-side; this crate is the
//! typed client over that REST boundary plus the state machines the UI needs.
//!
//! # Modules
//!
//! - [`config`] - Environment-driven configuration
//! - [`api`] - REST client for the store backend
//! - [`storage`] - Durable client-side key-value storage trait
//! - [`cart`] - Owned cart state with stock clamping and alerts
//! - [`coupon`] - Coupon listing, validation, and applied-coupon tracking
//! - [`stock`] - Pre-payment stock validation gate
//! - [`gateway`] - Payment gateway abstraction (the vendor modal seam)
//! - [`payment`] - Payment and retry-payment orchestrators
//! - [`countdown`] - Retry-window countdown timer
//! - [`error`] - Normalized payment attempt errors

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod countdown;
pub mod coupon;
pub mod error;
pub mod gateway;
pub mod payment;
pub mod stock;
pub mod storage;
