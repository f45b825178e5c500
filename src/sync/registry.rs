//! Stream registry and event broadcaster.
//!
//! Tracks every open outbound stream and fans a serialized event out to all
//! of them. Per-stream delivery failure is swallowed: a half-closed socket
//! must neither fail the broadcast nor block delivery to other streams. The
//! stream's own drop guard removes the handle exactly once.

use std::collections::HashMap;
use std::sync::{Arc, RwLock, Weak};

use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::listing::{EventName, WireMessage};
use crate::observability::Logger;

use super::errors::SyncResult;

/// Sender half of one client stream
type StreamSender = mpsc::UnboundedSender<String>;

/// Receiver half handed to the HTTP layer to feed the SSE response
pub type StreamReceiver = mpsc::UnboundedReceiver<String>;

/// Registry of all currently-open outbound streams.
#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: RwLock<HashMap<Uuid, StreamSender>>,
}

impl StreamRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new stream.
    ///
    /// Returns the receiver to drain into the client connection and a guard
    /// that removes the stream from the registry when dropped. The HTTP
    /// layer keeps the guard alive for the lifetime of the connection, so
    /// disconnect (guard drop) deregisters the handle exactly once.
    pub fn register(self: &Arc<Self>) -> (StreamGuard, StreamReceiver) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();

        if let Ok(mut streams) = self.streams.write() {
            streams.insert(id, tx);
        }

        Logger::trace("STREAM_OPENED", &[("stream_id", &id.to_string())]);

        let guard = StreamGuard {
            id,
            registry: Arc::downgrade(self),
        };
        (guard, rx)
    }

    /// Remove a stream handle. Safe to call for an already-removed id.
    fn remove(&self, id: Uuid) {
        if let Ok(mut streams) = self.streams.write() {
            if streams.remove(&id).is_some() {
                Logger::trace("STREAM_CLOSED", &[("stream_id", &id.to_string())]);
            }
        }
    }

    /// Broadcast an event to every active stream.
    ///
    /// The message is serialized once; delivery is best-effort with no
    /// ordering guarantee across streams. A send failure means the client
    /// disconnected mid-broadcast and its guard will clean up.
    pub fn broadcast(&self, name: EventName, payload: Value) -> SyncResult<BroadcastOutcome> {
        let message = WireMessage::new(name, payload).encode()?;

        let mut outcome = BroadcastOutcome::default();
        let streams = match self.streams.read() {
            Ok(s) => s,
            Err(_) => return Ok(outcome),
        };

        outcome.attempted = streams.len();
        for sender in streams.values() {
            match sender.send(message.clone()) {
                Ok(()) => outcome.delivered += 1,
                Err(_) => outcome.failed += 1,
            }
        }

        Ok(outcome)
    }

    /// Number of currently-open streams
    pub fn active_count(&self) -> usize {
        self.streams.read().map(|s| s.len()).unwrap_or(0)
    }
}

/// Removes its stream from the registry on drop.
#[derive(Debug)]
pub struct StreamGuard {
    id: Uuid,
    registry: Weak<StreamRegistry>,
}

impl StreamGuard {
    /// The opaque handle of the guarded stream
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

/// Result of one broadcast attempt
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastOutcome {
    /// Streams that were open when the broadcast started
    pub attempted: usize,
    /// Deliveries accepted by the stream channel
    pub delivered: usize,
    /// Deliveries that failed (client gone mid-broadcast)
    pub failed: usize,
}
