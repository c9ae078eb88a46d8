//! REST client for the store backend.
//!
//! Every call carries the cookie-based session (the client keeps a cookie
//! store) and speaks camelCase JSON, except the gateway verification payload
//! which uses the vendor's snake_case field names. The available-coupons list
//! is cached in-memory via `moka`.
//!
//! The backend is authoritative for pricing, stock, coupon eligibility, and
//! payment verification; this client only moves typed payloads across that
//! boundary.

use std::sync::Arc;

use moka::future::Cache;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use marigold_core::{AppliedCoupon, CartLineItem, Coupon, Order, OrderId, ProductId, VariantId};

use crate::config::CheckoutConfig;

/// Errors that can occur when talking to the store backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response. `message` is the server's own text,
    /// surfaced verbatim to the user where the caller chooses to.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a response body.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Client for the store backend REST API.
///
/// Cheap to clone; all clones share one HTTP client, cookie store, and
/// coupon cache.
#[derive(Clone)]
pub struct StoreApiClient {
    inner: Arc<StoreApiClientInner>,
}

struct StoreApiClientInner {
    client: reqwest::Client,
    base_url: String,
    coupon_cache: Cache<String, Vec<Coupon>>,
}

const COUPON_CACHE_KEY: &str = "coupons";

impl StoreApiClient {
    /// Create a new backend client from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CheckoutConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder().cookie_store(true).build()?;

        let coupon_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(config.coupon_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(StoreApiClientInner {
                client,
                base_url: config.api_base_url.as_str().trim_end_matches('/').to_string(),
                coupon_cache,
            }),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    /// Turn a non-success response into an `ApiError`, preserving the
    /// server's `{message}` body when it sends one.
    async fn api_error(status: reqwest::StatusCode, response: reqwest::Response) -> ApiError {
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .map_or(body, |parsed| parsed.message);
        ApiError::Api {
            status: status.as_u16(),
            message,
        }
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::Parse(e.to_string()))
    }

    // =========================================================================
    // Stock
    // =========================================================================

    /// Ask the backend whether the candidate line items are still purchasable.
    ///
    /// A `valid: false` response is not an `Err`; the caller branches on the
    /// structured payload.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be parsed.
    #[instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn validate_stock(
        &self,
        items: &[StockCheckItem],
    ) -> Result<StockCheckResponse, ApiError> {
        let url = self.endpoint("validate-stock");
        let response = self
            .inner
            .client
            .post(&url)
            .json(&StockCheckRequest { items })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(status, response).await);
        }
        Self::parse(response).await
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// Create a server-side payment-gateway order for `amount_minor` (integer
    /// smallest-currency-unit amount).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be parsed.
    #[instrument(skip(self))]
    pub async fn create_payment(&self, amount_minor: i64) -> Result<GatewayOrder, ApiError> {
        let url = self.endpoint("create-payment");
        let body = CreatePaymentRequest {
            amount: amount_minor,
            receipt: uuid::Uuid::new_v4().to_string(),
        };
        let response = self.inner.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(status, response).await);
        }
        Self::parse(response).await
    }

    /// Verify a completed gateway payment server-side.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the payment or the request fails.
    /// A rejection must never be treated as success by the caller.
    #[instrument(skip(self, verification), fields(order_id = %verification.razorpay_order_id))]
    pub async fn verify_payment(&self, verification: &PaymentVerification) -> Result<(), ApiError> {
        let url = self.endpoint("verify-payment");
        self.post_verification(&url, verification).await
    }

    /// Request a fresh gateway order for a previously failed order.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be parsed.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn create_retry_payment(&self, order_id: &OrderId) -> Result<GatewayOrder, ApiError> {
        let url = self.endpoint(&format!("orders/{order_id}/retry-payment"));
        let response = self.inner.client.post(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(status, response).await);
        }
        Self::parse(response).await
    }

    /// Verify a completed retry payment server-side.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the payment or the request fails.
    #[instrument(skip(self, verification), fields(order_id = %order_id))]
    pub async fn verify_retry_payment(
        &self,
        order_id: &OrderId,
        verification: &PaymentVerification,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("orders/{order_id}/verify-retry-payment"));
        self.post_verification(&url, verification).await
    }

    async fn post_verification(
        &self,
        url: &str,
        verification: &PaymentVerification,
    ) -> Result<(), ApiError> {
        let response = self.inner.client.post(url).json(verification).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(status, response).await);
        }

        let outcome: VerificationResponse = Self::parse(response).await?;
        if outcome.verified {
            Ok(())
        } else {
            Err(ApiError::Api {
                status: status.as_u16(),
                message: outcome
                    .message
                    .unwrap_or_else(|| "payment verification failed".to_string()),
            })
        }
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Fetch the client view of an order (used for tracking and the retry
    /// screen).
    ///
    /// # Errors
    ///
    /// Returns error if the order is missing or the request fails.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: &OrderId) -> Result<Order, ApiError> {
        let url = self.endpoint(&format!("orders/{order_id}"));
        let response = self.inner.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(status, response).await);
        }
        Self::parse(response).await
    }

    // =========================================================================
    // Cart
    // =========================================================================

    /// Fetch the server-side copy of the user's cart.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the response cannot be parsed.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn fetch_cart(&self, user_id: &str) -> Result<Vec<CartLineItem>, ApiError> {
        let url = self.endpoint(&format!("cart/{user_id}"));
        let response = self.inner.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(status, response).await);
        }
        let body: CartResponse = Self::parse(response).await?;
        Ok(body.items)
    }

    /// Clear the server-side copy of the user's cart.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails.
    #[instrument(skip(self), fields(user_id = %user_id))]
    pub async fn clear_cart(&self, user_id: &str) -> Result<(), ApiError> {
        let url = self.endpoint(&format!("cart/clear/{user_id}"));
        let response = self.inner.client.delete(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(status, response).await);
        }
        Ok(())
    }

    // =========================================================================
    // Coupons
    // =========================================================================

    /// List the currently valid coupons, cached per the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails; the caller treats this as a
    /// loading failure, not fatal.
    #[instrument(skip(self))]
    pub async fn available_coupons(&self) -> Result<Vec<Coupon>, ApiError> {
        if let Some(coupons) = self.inner.coupon_cache.get(COUPON_CACHE_KEY).await {
            debug!("Cache hit for available coupons");
            return Ok(coupons);
        }

        let url = self.endpoint("coupons");
        let response = self.inner.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(status, response).await);
        }
        let coupons: Vec<Coupon> = Self::parse(response).await?;

        self.inner
            .coupon_cache
            .insert(COUPON_CACHE_KEY.to_string(), coupons.clone())
            .await;
        Ok(coupons)
    }

    /// Validate a coupon code against the current cart subtotal.
    ///
    /// The server is authoritative on eligibility; its rejection message is
    /// preserved verbatim in [`ApiError::Api`].
    ///
    /// # Errors
    ///
    /// Returns error if the server rejects the code or the request fails.
    #[instrument(skip(self, cart_total), fields(code = %code))]
    pub async fn validate_coupon(
        &self,
        code: &str,
        cart_total: Decimal,
    ) -> Result<AppliedCoupon, ApiError> {
        let url = self.endpoint("coupons/validate");
        let body = CouponValidateRequest {
            code: code.to_string(),
            cart_total,
        };
        let response = self.inner.client.post(&url).json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::api_error(status, response).await);
        }
        Self::parse(response).await
    }
}

// =============================================================================
// Wire Types
// =============================================================================

/// One candidate line of a pre-payment stock check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockCheckItem {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: u32,
}

impl From<&CartLineItem> for StockCheckItem {
    fn from(line: &CartLineItem) -> Self {
        Self {
            product_id: line.product_id.clone(),
            variant_id: line.variant_id.clone(),
            quantity: line.quantity,
        }
    }
}

#[derive(Debug, Serialize)]
struct StockCheckRequest<'a> {
    items: &'a [StockCheckItem],
}

/// Backend verdict on a stock check.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockCheckResponse {
    pub valid: bool,
    #[serde(default)]
    pub invalid_items: Vec<InvalidItem>,
}

/// One unpurchasable item reported by the stock check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvalidItem {
    #[serde(default)]
    pub product_id: Option<ProductId>,
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    pub message: String,
}

#[derive(Debug, Serialize)]
struct CreatePaymentRequest {
    amount: i64,
    receipt: String,
}

/// A server-created payment-gateway order.
///
/// `order_id` stays optional so a malformed backend response surfaces as a
/// typed initialization failure instead of a parse error.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayOrder {
    #[serde(default)]
    pub order_id: Option<String>,
    pub amount: i64,
    pub currency: String,
}

/// Proof of a completed gateway payment, in the vendor's own field names.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentVerification {
    pub razorpay_payment_id: String,
    pub razorpay_order_id: String,
    pub razorpay_signature: String,
}

#[derive(Debug, Deserialize)]
struct VerificationResponse {
    #[serde(default = "default_verified")]
    verified: bool,
    #[serde(default)]
    message: Option<String>,
}

const fn default_verified() -> bool {
    true
}

#[derive(Debug, Deserialize)]
struct CartResponse {
    #[serde(default)]
    items: Vec<CartLineItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CouponValidateRequest {
    code: String,
    #[serde(with = "rust_decimal::serde::float")]
    cart_total: Decimal,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::Api {
            status: 400,
            message: "Coupon expired".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 400 - Coupon expired");
    }

    #[test]
    fn test_gateway_order_tolerates_missing_id() {
        let order: GatewayOrder =
            serde_json::from_str(r#"{"amount": 72000, "currency": "INR"}"#).unwrap();
        assert_eq!(order.order_id, None);
        assert_eq!(order.amount, 72000);
    }

    #[test]
    fn test_stock_check_response_defaults() {
        let response: StockCheckResponse = serde_json::from_str(r#"{"valid": true}"#).unwrap();
        assert!(response.valid);
        assert!(response.invalid_items.is_empty());
    }

    #[test]
    fn test_verification_payload_uses_vendor_field_names() {
        let verification = PaymentVerification {
            razorpay_payment_id: "pay_1".to_string(),
            razorpay_order_id: "order_1".to_string(),
            razorpay_signature: "sig".to_string(),
        };
        let json = serde_json::to_value(&verification).unwrap();
        assert!(json.get("razorpay_payment_id").is_some());
        assert!(json.get("razorpay_signature").is_some());
    }
}
