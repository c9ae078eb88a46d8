//! Durable client-side key-value storage.
//!
//! The cart and the applied coupon survive a page reload in the original
//! client via local storage. This trait is the seam for that: embedders
//! provide whatever durable store their platform has; tests and headless use
//! get [`MemoryStorage`]. Last writer wins, no merge logic (single active
//! client assumed).

use std::collections::HashMap;
use std::sync::Mutex;

/// Well-known storage keys.
pub mod keys {
    /// Key for the serialized cart line items.
    pub const CART_ITEMS: &str = "cart_items";

    /// Key for the applied coupon's `{code, discountAmount}` copy.
    pub const APPLIED_COUPON: &str = "applied_coupon";
}

/// Durable string-keyed storage for small client state.
///
/// Writes are best-effort; implementations log rather than propagate their
/// own failures, mirroring how local storage behaves.
pub trait CheckoutStorage: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn read(&self, key: &str) -> Option<String>;

    /// Store `value` under `key`, replacing any previous value.
    fn write(&self, key: &str, value: &str);

    /// Remove the value stored under `key`, if any.
    fn remove(&self, key: &str);
}

/// In-memory storage for tests and headless embedders.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckoutStorage for MemoryStorage {
    fn read(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .map_or(None, |entries| entries.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }
}
