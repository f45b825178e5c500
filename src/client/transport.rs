//! Client transport manager.
//!
//! Owns the single process-wide streaming connection. All namespaces
//! multiplex over this one transport; it opens lazily on first subscribe,
//! demultiplexes inbound messages to the subscription registry, and
//! recovers from drops with a fixed-delay, debounced reconnect.
//!
//! State machine: Disconnected -> Connecting -> Connected -> Disconnected.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::watch;

use crate::listing::{EventName, WireMessage};
use crate::observability::Logger;

use super::connector::LiveConnector;
use super::subscription::SubscriptionRegistry;

/// Fixed delay before a reconnect attempt
pub const RECONNECT_DELAY: Duration = Duration::from_millis(2_000);

/// Connection lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Manages the shared streaming connection.
pub struct TransportManager {
    connector: Arc<dyn LiveConnector>,
    registry: Arc<SubscriptionRegistry>,
    state: RwLock<ConnectionState>,
    connected: watch::Sender<bool>,
    reconnect_pending: AtomicBool,
    closed: AtomicBool,
}

impl TransportManager {
    /// Create a transport over the given connector and registry
    pub fn new(
        connector: Arc<dyn LiveConnector>,
        registry: Arc<SubscriptionRegistry>,
    ) -> Arc<Self> {
        let (connected, _) = watch::channel(false);
        Arc::new(Self {
            connector,
            registry,
            state: RwLock::new(ConnectionState::Disconnected),
            connected,
            reconnect_pending: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> ConnectionState {
        self.state
            .read()
            .map(|s| *s)
            .unwrap_or(ConnectionState::Disconnected)
    }

    /// Whether the transport currently holds an open connection
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Observable connection flag, for UI availability indicators
    pub fn watch_connected(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }

    /// Open the transport if it is not already open or opening.
    ///
    /// A no-op when called outside a Tokio runtime: the transport stays
    /// disconnected and a later subscribe from async context retries.
    pub fn ensure_connected(self: &Arc<Self>) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        {
            let mut state = match self.state.write() {
                Ok(s) => s,
                Err(_) => return,
            };
            if *state != ConnectionState::Disconnected {
                return;
            }
            *state = ConnectionState::Connecting;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            self.set_state(ConnectionState::Disconnected);
            return;
        };

        let manager = Arc::clone(self);
        handle.spawn(async move {
            manager.run_connection().await;
        });
    }

    /// Stop the transport for good; no further reconnects are scheduled.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.connected.send_replace(false);
    }

    async fn run_connection(self: Arc<Self>) {
        match self.connector.connect().await {
            Ok(mut stream) => {
                self.set_state(ConnectionState::Connected);
                self.connected.send_replace(true);
                Logger::info("SSE_CONNECTED", &[]);

                while let Some(raw) = stream.next().await {
                    self.handle_message(&raw);
                }

                Logger::warn("SSE_CONNECTION_LOST", &[]);
            }
            Err(err) => {
                Logger::warn("SSE_CONNECT_FAILED", &[("error", &err.to_string())]);
            }
        }

        self.set_state(ConnectionState::Disconnected);
        self.connected.send_replace(false);
        self.schedule_reconnect();
    }

    /// Parse and route one inbound message.
    ///
    /// Malformed messages are logged and discarded; they never tear down
    /// the connection or trigger a reconnect.
    fn handle_message(&self, raw: &str) {
        let message = match WireMessage::decode(raw) {
            Ok(m) => m,
            Err(err) => {
                Logger::error("SSE_PARSE_FAILED", &[("error", &err.to_string())]);
                return;
            }
        };

        let name = match EventName::parse(&message.event) {
            Some(n) => n,
            None => {
                Logger::warn("SSE_UNKNOWN_EVENT", &[("event", &message.event)]);
                return;
            }
        };

        if !self.registry.dispatch(name, message.payload) {
            // Stores mount and unmount independently of server broadcast
            // timing; a missing subscriber is expected, not an error.
            Logger::trace("SSE_UNROUTED_EVENT", &[("event", &message.event)]);
        }
    }

    /// Schedule exactly one reconnect attempt after the fixed delay.
    ///
    /// Repeated errors before the timer fires must not pile up timers; the
    /// pending flag guards against that and is cleared when the attempt
    /// fires so a later error can schedule again.
    fn schedule_reconnect(self: &Arc<Self>) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if self.reconnect_pending.swap(true, Ordering::SeqCst) {
            return;
        }

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(RECONNECT_DELAY).await;
            manager.reconnect_pending.store(false, Ordering::SeqCst);
            manager.ensure_connected();
        });
    }

    fn set_state(&self, next: ConnectionState) {
        if let Ok(mut state) = self.state.write() {
            *state = next;
        }
    }
}

impl std::fmt::Debug for TransportManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportManager")
            .field("state", &self.state())
            .field("connected", &self.is_connected())
            .finish()
    }
}
