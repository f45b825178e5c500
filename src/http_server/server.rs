//! # HTTP Server
//!
//! Combines the listing API and the SSE stream into one axum router.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

use crate::catalog::Catalog;
use crate::observability::Logger;
use crate::sync::StreamRegistry;

use super::config::HttpServerConfig;
use super::listing_routes::{listing_routes, ApiState};
use super::sse_routes::sse_routes;

/// The catalogue HTTP server
pub struct HttpServer {
    config: HttpServerConfig,
    router: Router,
}

impl HttpServer {
    /// Create a server with default configuration and fresh state
    pub fn new() -> Self {
        Self::with_config(HttpServerConfig::default())
    }

    /// Create a server with custom configuration and fresh state
    pub fn with_config(config: HttpServerConfig) -> Self {
        let catalog = Arc::new(Catalog::new());
        let streams = Arc::new(StreamRegistry::new());
        Self::with_parts(config, catalog, streams)
    }

    /// Create a server around existing catalogue and stream registry
    /// instances, so the composition root can keep handles to both.
    pub fn with_parts(
        config: HttpServerConfig,
        catalog: Arc<Catalog>,
        streams: Arc<StreamRegistry>,
    ) -> Self {
        let router = Self::build_router(&config, catalog, streams);
        Self { config, router }
    }

    fn build_router(
        config: &HttpServerConfig,
        catalog: Arc<Catalog>,
        streams: Arc<StreamRegistry>,
    ) -> Router {
        let api_state = Arc::new(ApiState::new(catalog, Arc::clone(&streams)));

        let cors = if config.cors_origins.is_empty() {
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        } else {
            use tower_http::cors::AllowOrigin;
            let origins: Vec<_> = config
                .cors_origins
                .iter()
                .filter_map(|s| s.parse().ok())
                .collect();

            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods(Any)
                .allow_headers(Any)
        };

        Router::new()
            .route("/health", get(health_handler))
            .merge(sse_routes(streams))
            .nest("/api", listing_routes(api_state))
            .layer(cors)
    }

    /// Get the socket address
    pub fn socket_addr(&self) -> String {
        self.config.socket_addr()
    }

    /// Get the router (for testing)
    pub fn router(self) -> Router {
        self.router
    }

    /// Start the HTTP server (async)
    pub async fn start(self) -> Result<(), std::io::Error> {
        let addr: SocketAddr = self
            .config
            .socket_addr()
            .parse()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

        Logger::info("HTTP_SERVER_STARTED", &[("addr", &addr.to_string())]);

        let listener = TcpListener::bind(addr).await?;
        axum::serve(listener, self.router).await?;

        Ok(())
    }
}

impl Default for HttpServer {
    fn default() -> Self {
        Self::new()
    }
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_creation() {
        let server = HttpServer::new();
        assert_eq!(server.socket_addr(), "0.0.0.0:8420");
    }

    #[test]
    fn test_server_with_custom_port() {
        let config = HttpServerConfig::with_port(8080);
        let server = HttpServer::with_config(config);
        assert_eq!(server.socket_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_router_builds() {
        let server = HttpServer::new();
        let _router = server.router();
    }
}
