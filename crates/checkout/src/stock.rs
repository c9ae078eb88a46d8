//! Pre-payment stock validation gate.
//!
//! Before a payment attempt starts, the backend is asked whether every
//! requested line is still purchasable. Items reported unpurchasable and the
//! check itself being unreachable both come back through one error contract.

use thiserror::Error;
use tracing::{instrument, warn};

use crate::api::{ApiError, InvalidItem, StockCheckItem, StoreApiClient};

/// One or more items are no longer purchasable.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct StockError {
    /// Human-readable summary, concatenated from the per-item messages.
    pub message: String,
    /// The structured per-item failures.
    pub invalid_items: Vec<InvalidItem>,
}

/// Failure contract of the stock gate.
#[derive(Debug, Error)]
pub enum StockGateError {
    /// The backend reported specific items as unpurchasable.
    #[error(transparent)]
    Unpurchasable(StockError),

    /// The check itself could not be completed (transport or backend
    /// failure); carries a generic message rather than a guessed reason.
    #[error("Unable to verify stock availability")]
    Unavailable(#[from] ApiError),
}

/// Remote check that requested items are still purchasable.
#[derive(Clone)]
pub struct StockValidationGate {
    api: StoreApiClient,
}

impl StockValidationGate {
    /// Create a gate over the given backend client.
    #[must_use]
    pub const fn new(api: StoreApiClient) -> Self {
        Self { api }
    }

    /// Validate the candidate items.
    ///
    /// # Errors
    ///
    /// Returns [`StockGateError::Unpurchasable`] when the backend reports any
    /// item unpurchasable, [`StockGateError::Unavailable`] when the check
    /// cannot be completed.
    #[instrument(skip(self, items), fields(item_count = items.len()))]
    pub async fn validate(&self, items: &[StockCheckItem]) -> Result<(), StockGateError> {
        let response = self.api.validate_stock(items).await?;

        if response.valid {
            return Ok(());
        }

        let message = join_messages(&response.invalid_items);
        warn!(invalid_count = response.invalid_items.len(), "Stock check rejected items");
        Err(StockGateError::Unpurchasable(StockError {
            message,
            invalid_items: response.invalid_items,
        }))
    }
}

fn join_messages(invalid_items: &[InvalidItem]) -> String {
    if invalid_items.is_empty() {
        return "Some items in your cart are no longer available".to_string();
    }
    invalid_items
        .iter()
        .map(|item| item.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
