//! # Live Sync Client
//!
//! Embeddable client for the server's live listing stream. One shared
//! transport carries every namespace; per-namespace listing stores keep a
//! local cache reconciled against live `added`/`updated`/`deleted` events
//! under a user-selected update mode.
//!
//! Typical wiring:
//!
//! 1. Build a [`LiveClient`] over an [`HttpSseConnector`].
//! 2. Create one [`ListingStore`] per listing type, sharing one
//!    [`Settings`] and one [`ActiveRoute`].
//! 3. Call `init_live_updates` on each store; the first subscription opens
//!    the connection.

pub mod connector;
pub mod settings;
pub mod store;
pub mod subscription;
pub mod transport;

pub use connector::{ChannelConnector, HttpSseConnector, LiveConnector, MessageStream, SseDecoder};
pub use settings::{ActiveRoute, Settings, UpdateMode};
pub use store::{
    HttpListingFetcher, ListingFetcher, ListingStore, ListingStoreOptions, DEFAULT_REFRESH_WINDOW,
};
pub use subscription::{EventCallback, SubscriptionRegistry};
pub use transport::{ConnectionState, TransportManager, RECONNECT_DELAY};

use std::sync::Arc;

use crate::listing::{ListingAction, ListingKind};

/// Facade tying the shared transport to the subscription registry.
///
/// Subscribing lazily opens the connection; the transport stays up for the
/// life of the client and is shared by every store.
pub struct LiveClient {
    transport: Arc<TransportManager>,
    registry: Arc<SubscriptionRegistry>,
}

impl LiveClient {
    /// Create a client over the given connector
    pub fn new(connector: Arc<dyn LiveConnector>) -> Arc<Self> {
        let registry = Arc::new(SubscriptionRegistry::new());
        let transport = TransportManager::new(connector, Arc::clone(&registry));
        Arc::new(Self { transport, registry })
    }

    /// Register a callback for `(kind, action)` and open the transport if
    /// it is not already open. A later subscribe for the same pair replaces
    /// the earlier one.
    pub fn subscribe(&self, kind: ListingKind, action: ListingAction, callback: EventCallback) {
        self.transport.ensure_connected();
        self.registry.subscribe(kind, action, callback);
    }

    /// Drop every callback registered under a namespace
    pub fn unsubscribe(&self, kind: ListingKind) {
        self.registry.unsubscribe(kind);
    }

    /// Whether the shared connection is currently open
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Observable connection flag
    pub fn watch_connected(&self) -> tokio::sync::watch::Receiver<bool> {
        self.transport.watch_connected()
    }

    /// The subscription registry backing this client
    pub fn registry(&self) -> &Arc<SubscriptionRegistry> {
        &self.registry
    }

    /// The shared transport
    pub fn transport(&self) -> &Arc<TransportManager> {
        &self.transport
    }

    /// Close the transport permanently; no further reconnects
    pub fn shutdown(&self) {
        self.transport.shutdown();
    }
}

impl std::fmt::Debug for LiveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveClient")
            .field("transport", &self.transport)
            .field("registry", &self.registry)
            .finish()
    }
}
