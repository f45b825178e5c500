//! modshelf - A self-hostable catalogue server for game-modification
//! assets, with live listing synchronization over server-sent events.
//!
//! The server side exposes a REST listing API plus an SSE stream that
//! broadcasts every catalogue mutation; the client side keeps per-type
//! listing stores reconciled against that stream.

pub mod catalog;
pub mod cli;
pub mod client;
pub mod http_server;
pub mod listing;
pub mod observability;
pub mod sync;
