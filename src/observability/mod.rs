//! # Observability
//!
//! Structured JSON logging shared by the catalogue server and the live-sync
//! client. Logging is synchronous, one line per event, and must never affect
//! the operation that emitted it.

pub mod logger;

pub use logger::{Logger, Severity};
