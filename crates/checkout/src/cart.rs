//! Client-side cart state.
//!
//! The cart is authoritative locally until synced: mutations are synchronous
//! reducer-style updates on one owned container, persisted to durable client
//! storage on every change. The server-side copy is reconciled one way only:
//! a fetch replaces local state wholesale, and local mutations never push.
//! That is a documented limitation, not a consistency guarantee.
//!
//! Invariant: no line ever holds `quantity < 1` or `quantity > stock`, where
//! `stock` is the last-known snapshot (which may be stale relative to the
//! server; the pre-payment stock gate is the real check).

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use marigold_core::pricing;
use marigold_core::{CartLineItem, Offer, ProductId, ProductSummary, Variant, VariantId};

use crate::api::{ApiError, StoreApiClient};
use crate::storage::{CheckoutStorage, keys};

/// Unique key of a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub product_id: ProductId,
    pub variant_id: VariantId,
}

impl LineKey {
    fn of(line: &CartLineItem) -> Self {
        Self {
            product_id: line.product_id.clone(),
            variant_id: line.variant_id.clone(),
        }
    }
}

/// Why a stock alert was raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockAlertKind {
    /// An add-to-cart increase was reduced to fit the known stock.
    StockAdjusted,
    /// A quantity update was reduced to fit the known stock.
    StockLimit,
}

/// Non-blocking notice that a requested quantity was reduced by clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAlert {
    pub kind: StockAlertKind,
    pub requested: u32,
    pub available: u32,
}

/// Result of an add-to-cart operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The line now holds `quantity`; `clamped` is true when the request was
    /// reduced to fit stock.
    Added { quantity: u32, clamped: bool },
    /// The variant has no stock at all; nothing was added.
    OutOfStock,
}

/// Owned cart state with a defined mutation surface.
pub struct CartStore {
    items: Vec<CartLineItem>,
    alerts: HashMap<LineKey, StockAlert>,
    storage: Arc<dyn CheckoutStorage>,
}

impl CartStore {
    /// Create a cart, restoring any persisted line items from storage.
    #[must_use]
    pub fn new(storage: Arc<dyn CheckoutStorage>) -> Self {
        let items = storage
            .read(keys::CART_ITEMS)
            .and_then(|json| match serde_json::from_str(&json) {
                Ok(items) => Some(items),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable persisted cart");
                    None
                }
            })
            .unwrap_or_default();

        Self {
            items,
            alerts: HashMap::new(),
            storage,
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` of a variant, merging into an existing line when one
    /// exists for the same `(product, variant)` pair.
    ///
    /// The unit price is the effective sale price at the time of this call
    /// and stays frozen on the line afterwards. Quantities are clamped to the
    /// variant's stock; a reduced request raises a [`StockAlertKind::StockAdjusted`]
    /// alert keyed by the line.
    pub fn add(
        &mut self,
        product: &ProductSummary,
        variant: &Variant,
        quantity: u32,
        offer: Option<&Offer>,
    ) -> AddOutcome {
        if variant.stock == 0 {
            return AddOutcome::OutOfStock;
        }

        let key = LineKey {
            product_id: product.id.clone(),
            variant_id: variant.id.clone(),
        };

        let (requested, clamped_quantity) = if let Some(line) = self.find_mut(&key) {
            let requested = line.quantity.saturating_add(quantity);
            let clamped_quantity = requested.clamp(1, variant.stock);
            line.quantity = clamped_quantity;
            line.stock = variant.stock;
            (requested, clamped_quantity)
        } else {
            let requested = quantity.max(1);
            let clamped_quantity = requested.min(variant.stock);
            self.items.push(CartLineItem {
                product_id: product.id.clone(),
                variant_id: variant.id.clone(),
                name: product.name.clone(),
                unit_price: pricing::effective_price(variant, offer),
                quantity: clamped_quantity,
                image_url: product.image_url.clone(),
                size: variant.size.clone(),
                stock: variant.stock,
            });
            (requested, clamped_quantity)
        };

        if clamped_quantity < requested {
            self.alerts.insert(
                key,
                StockAlert {
                    kind: StockAlertKind::StockAdjusted,
                    requested,
                    available: variant.stock,
                },
            );
        } else {
            self.alerts.remove(&key);
        }

        self.persist();
        AddOutcome::Added {
            quantity: clamped_quantity,
            clamped: clamped_quantity < requested,
        }
    }

    /// Remove a line and any alert attached to it.
    pub fn remove(&mut self, product_id: &ProductId, variant_id: &VariantId) {
        let key = LineKey {
            product_id: product_id.clone(),
            variant_id: variant_id.clone(),
        };
        self.items.retain(|line| LineKey::of(line) != key);
        self.alerts.remove(&key);
        self.persist();
    }

    /// Set a line's quantity, clamped to `[1, available_stock]` (falling back
    /// to the line's stock snapshot when the caller has no fresher value).
    ///
    /// Returns the resulting quantity, or `None` when no such line exists. A
    /// reduced request raises a [`StockAlertKind::StockLimit`] alert. A
    /// zero-availability report leaves the line untouched and raises the
    /// alert; removal is the caller's decision, and the pre-payment stock
    /// gate is the enforcement point.
    pub fn update_quantity(
        &mut self,
        product_id: &ProductId,
        variant_id: &VariantId,
        quantity: u32,
        available_stock: Option<u32>,
    ) -> Option<u32> {
        let key = LineKey {
            product_id: product_id.clone(),
            variant_id: variant_id.clone(),
        };
        let line = self.find_mut(&key)?;

        if available_stock == Some(0) {
            let current = line.quantity;
            self.alerts.insert(
                key,
                StockAlert {
                    kind: StockAlertKind::StockLimit,
                    requested: quantity,
                    available: 0,
                },
            );
            return Some(current);
        }

        let limit = available_stock.unwrap_or(line.stock).max(1);
        if let Some(stock) = available_stock {
            line.stock = stock;
        }

        let clamped_quantity = quantity.clamp(1, limit);
        line.quantity = clamped_quantity;

        if clamped_quantity < quantity {
            self.alerts.insert(
                key,
                StockAlert {
                    kind: StockAlertKind::StockLimit,
                    requested: quantity,
                    available: limit,
                },
            );
        } else {
            self.alerts.remove(&key);
        }

        self.persist();
        Some(clamped_quantity)
    }

    /// Empty the local cart and its persisted copy.
    pub fn clear(&mut self) {
        self.items.clear();
        self.alerts.clear();
        self.storage.remove(keys::CART_ITEMS);
    }

    /// Clear the server-side cart, then the local one.
    ///
    /// The local clear happens even when the remote call fails (best-effort);
    /// the error is returned so the caller can log it before navigating away.
    ///
    /// # Errors
    ///
    /// Returns the remote failure, if any.
    pub async fn clear_remote(
        &mut self,
        api: &StoreApiClient,
        user_id: &str,
    ) -> Result<(), ApiError> {
        let result = api.clear_cart(user_id).await;
        if let Err(e) = &result {
            warn!(error = %e, "Remote cart clear failed; clearing locally anyway");
        }
        self.clear();
        result
    }

    /// Replace local state with the server-side copy (fetch-on-mount wins).
    ///
    /// # Errors
    ///
    /// Returns the fetch failure; local state is untouched in that case.
    pub async fn replace_from_remote(
        &mut self,
        api: &StoreApiClient,
        user_id: &str,
    ) -> Result<(), ApiError> {
        let items = api.fetch_cart(user_id).await?;
        self.items = items;
        self.alerts.clear();
        self.persist();
        Ok(())
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The current line items.
    #[must_use]
    pub fn items(&self) -> &[CartLineItem] {
        &self.items
    }

    /// Sum of line totals at their frozen unit prices.
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(CartLineItem::line_total).sum()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|line| line.quantity).sum()
    }

    /// Whether the cart holds no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Outstanding stock alerts, keyed by line.
    #[must_use]
    pub const fn alerts(&self) -> &HashMap<LineKey, StockAlert> {
        &self.alerts
    }

    /// The alert for one line, if any.
    #[must_use]
    pub fn alert_for(&self, product_id: &ProductId, variant_id: &VariantId) -> Option<&StockAlert> {
        self.alerts.get(&LineKey {
            product_id: product_id.clone(),
            variant_id: variant_id.clone(),
        })
    }

    fn find_mut(&mut self, key: &LineKey) -> Option<&mut CartLineItem> {
        self.items.iter_mut().find(|line| LineKey::of(line) == *key)
    }

    fn persist(&self) {
        match serde_json::to_string(&self.items) {
            Ok(json) => self.storage.write(keys::CART_ITEMS, &json),
            Err(e) => warn!(error = %e, "Failed to serialize cart for persistence"),
        }
    }
}
