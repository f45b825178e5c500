//! Server-Sent Events endpoint.
//!
//! `GET /sse` registers a new stream with the registry and keeps it open
//! until the client disconnects. The registry guard travels with the
//! response stream, so dropping the connection deregisters the handle
//! exactly once.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::routing::get;
use axum::Router;
use futures_util::stream::Stream;

use crate::sync::StreamRegistry;

/// Create the SSE route
pub fn sse_routes(registry: Arc<StreamRegistry>) -> Router {
    Router::new()
        .route("/sse", get(sse_handler))
        .with_state(registry)
}

async fn sse_handler(
    State(registry): State<Arc<StreamRegistry>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (guard, receiver) = registry.register();

    let stream = futures_util::stream::unfold((receiver, guard), |(mut rx, guard)| async move {
        let message = rx.recv().await?;
        Some((Ok(Event::default().data(message)), (rx, guard)))
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
