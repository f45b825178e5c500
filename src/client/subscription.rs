//! Client subscription registry.
//!
//! Routes decoded `(namespace, action)` pairs to the callback a listing
//! store registered for them. The mapping is a closed enum to a closed enum
//! to a single callback slot: at most one callback per pair, and a later
//! subscribe for the same pair replaces the earlier one silently.

use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use crate::listing::{EventName, ListingAction, ListingKind};

/// Callback invoked with the event payload
pub type EventCallback = Box<dyn Fn(Value) + Send + Sync>;

/// Registry of per-store event callbacks.
#[derive(Default)]
pub struct SubscriptionRegistry {
    entries: RwLock<HashMap<ListingKind, HashMap<ListingAction, EventCallback>>>,
}

impl SubscriptionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for `(kind, action)`, replacing any prior one.
    pub fn subscribe(&self, kind: ListingKind, action: ListingAction, callback: EventCallback) {
        if let Ok(mut entries) = self.entries.write() {
            entries.entry(kind).or_default().insert(action, callback);
        }
    }

    /// Remove every callback registered under a namespace.
    ///
    /// Used when a store tears down; other namespaces are untouched.
    pub fn unsubscribe(&self, kind: ListingKind) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(&kind);
        }
    }

    /// Invoke the callback for a decoded event, if one is registered.
    ///
    /// Returns false when no subscriber exists; stores mount and unmount
    /// independently of server broadcast timing, so that is expected.
    pub fn dispatch(&self, name: EventName, payload: Value) -> bool {
        let entries = match self.entries.read() {
            Ok(e) => e,
            Err(_) => return false,
        };

        match entries.get(&name.kind).and_then(|m| m.get(&name.action)) {
            Some(callback) => {
                callback(payload);
                true
            }
            None => false,
        }
    }

    /// Whether a callback exists for the pair
    pub fn has_subscription(&self, kind: ListingKind, action: ListingAction) -> bool {
        self.entries
            .read()
            .map(|e| e.get(&kind).map_or(false, |m| m.contains_key(&action)))
            .unwrap_or(false)
    }

    /// Number of namespaces with at least one callback
    pub fn namespace_count(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("namespaces", &self.namespace_count())
            .finish()
    }
}
