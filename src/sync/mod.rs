//! # Live Sync (server side)
//!
//! The broadcast half of the live-update subsystem: a registry of open
//! Server-Sent Event streams and a best-effort fan-out that pushes listing
//! mutations to every connected client.
//!
//! Delivery is at-most-once. Events broadcast while a client is disconnected
//! are lost for that client; periodic polling on the client side is the
//! correctness backstop.

pub mod errors;
pub mod registry;

pub use errors::{SyncError, SyncResult};
pub use registry::{BroadcastOutcome, StreamGuard, StreamRegistry};
