//! Checkout configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MARIGOLD_API_BASE_URL` - Base URL of the store backend
//! - `RAZORPAY_KEY_ID` - Payment gateway publishable key id
//!
//! ## Optional
//! - `MARIGOLD_PAYMENT_TIMEOUT_SECS` - Client-side payment timeout (default: 300)
//! - `MARIGOLD_COUPON_CACHE_TTL_SECS` - Available-coupons cache TTL (default: 300)

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Checkout core configuration.
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// Base URL of the store backend (catalog, orders, payments).
    pub api_base_url: Url,
    /// Payment gateway publishable key id, passed into the modal options.
    pub gateway_key_id: String,
    /// Hard cap on one payment attempt, from modal open to a terminal outcome.
    pub payment_timeout: Duration,
    /// How long the available-coupons list is cached.
    pub coupon_cache_ttl: Duration,
}

impl CheckoutConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base_url = parse_base_url(
            "MARIGOLD_API_BASE_URL",
            &get_required_env("MARIGOLD_API_BASE_URL")?,
        )?;
        let gateway_key_id = get_required_env("RAZORPAY_KEY_ID")?;
        let payment_timeout = parse_secs(
            "MARIGOLD_PAYMENT_TIMEOUT_SECS",
            &get_env_or_default("MARIGOLD_PAYMENT_TIMEOUT_SECS", "300"),
        )?;
        let coupon_cache_ttl = parse_secs(
            "MARIGOLD_COUPON_CACHE_TTL_SECS",
            &get_env_or_default("MARIGOLD_COUPON_CACHE_TTL_SECS", "300"),
        )?;

        Ok(Self {
            api_base_url,
            gateway_key_id,
            payment_timeout,
            coupon_cache_ttl,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse and validate a base URL.
fn parse_base_url(var_name: &str, value: &str) -> Result<Url, ConfigError> {
    let url: Url = value
        .parse()
        .map_err(|e: url::ParseError| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("not a usable base URL: {value}"),
        ));
    }
    Ok(url)
}

/// Parse a whole number of seconds into a `Duration`.
fn parse_secs(var_name: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_url_valid() {
        let url = parse_base_url("TEST_VAR", "https://api.example.com/v1").unwrap();
        assert_eq!(url.host_str(), Some("api.example.com"));
    }

    #[test]
    fn test_parse_base_url_rejects_garbage() {
        let result = parse_base_url("TEST_VAR", "not a url");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_parse_base_url_rejects_non_base() {
        let result = parse_base_url("TEST_VAR", "mailto:shop@example.com");
        assert!(matches!(result, Err(ConfigError::InvalidEnvVar(_, _))));
    }

    #[test]
    fn test_parse_secs() {
        assert_eq!(
            parse_secs("TEST_VAR", "300").unwrap(),
            Duration::from_secs(300)
        );
        assert!(parse_secs("TEST_VAR", "five").is_err());
    }
}
