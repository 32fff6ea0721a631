//! Persisted addon state, keyed by addon identifier.
//!
//! SYSTEM CONTEXT
//! ==============
//! The host gives every addon one persisted slot that survives panel
//! re-renders and is shared across consumers of the addon. The slot for
//! this addon (key [`events::ADDON_ID`]) holds the latest
//! [`events::AuditResults`]. The trait keeps the core testable and lets a
//! host back the slot with whatever storage it owns; [`MemoryStore`] is
//! the in-process default.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

/// Key-value slot storage for addon state.
pub trait AddonStore: Send + Sync {
    /// Read the slot for `key`, if one was ever written.
    fn get(&self, key: &str) -> Option<Value>;
    /// Replace the slot for `key`.
    fn set(&self, key: &str, value: Value);
}

/// Load and decode a typed value from an addon slot. A missing slot or a
/// slot that no longer matches the expected shape both read as `None`.
pub fn load_json<T: DeserializeOwned>(store: &dyn AddonStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    serde_json::from_value(raw).ok()
}

/// Encode and save a typed value into an addon slot.
pub fn save_json<T: Serialize>(store: &dyn AddonStore, key: &str, value: &T) {
    match serde_json::to_value(value) {
        Ok(raw) => store.set(key, raw),
        Err(e) => warn!(key, error = %e, "store: value not serializable, slot unchanged"),
    }
}

/// Shared in-memory store. All clones see the same slots.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    slots: Arc<Mutex<HashMap<String, Value>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AddonStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_owned(), value);
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
