//! # HTTP Server Module
//!
//! The axum surface of the catalogue: listing CRUD under `/api` and the
//! long-lived `GET /sse` stream that live-update clients attach to.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/api/{namespace}` - Listing CRUD (mutations broadcast live events)
//! - `/sse` - Server-Sent Events stream

pub mod config;
pub mod listing_routes;
pub mod server;
pub mod sse_routes;

pub use config::HttpServerConfig;
pub use server::HttpServer;
