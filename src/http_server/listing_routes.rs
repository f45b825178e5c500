//! Listing CRUD routes.
//!
//! Thin wrappers over the catalogue. Every successful mutation broadcasts
//! exactly one live event; broadcast failure is logged and never fails the
//! request.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::{Catalog, CatalogError};
use crate::listing::{EventName, ListingAction, ListingKind};
use crate::observability::Logger;
use crate::sync::StreamRegistry;

/// Shared state for the listing API
pub struct ApiState {
    pub catalog: Arc<Catalog>,
    pub streams: Arc<StreamRegistry>,
}

impl ApiState {
    pub fn new(catalog: Arc<Catalog>, streams: Arc<StreamRegistry>) -> Self {
        Self { catalog, streams }
    }
}

/// Create listing CRUD routes, nested under `/api`
pub fn listing_routes(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/:kind", get(list_handler).post(create_handler))
        .route(
            "/:kind/:id",
            get(fetch_one_handler)
                .put(update_handler)
                .delete(delete_handler),
        )
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
            code: status.as_u16(),
        }),
    )
}

fn parse_kind(kind: &str) -> Result<ListingKind, ApiError> {
    ListingKind::parse(kind)
        .ok_or_else(|| api_error(StatusCode::NOT_FOUND, format!("Unknown listing type: {kind}")))
}

fn map_catalog_error(err: CatalogError) -> ApiError {
    let status = match err {
        CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
        CatalogError::Conflict { .. } => StatusCode::CONFLICT,
        CatalogError::Invalid(_) => StatusCode::BAD_REQUEST,
        CatalogError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    api_error(status, err.to_string())
}

/// Broadcast one event for a successful mutation.
fn broadcast_mutation(state: &ApiState, kind: ListingKind, action: ListingAction, payload: Value) {
    let name = EventName::new(kind, action);
    match state.streams.broadcast(name, payload) {
        Ok(outcome) => Logger::trace(
            "LISTING_EVENT_BROADCAST",
            &[
                ("event", &name.to_string()),
                ("delivered", &outcome.delivered.to_string()),
                ("failed", &outcome.failed.to_string()),
            ],
        ),
        Err(err) => Logger::error(
            "LISTING_EVENT_BROADCAST_FAILED",
            &[("event", &name.to_string()), ("error", &err.to_string())],
        ),
    }
}

async fn list_handler(
    State(state): State<Arc<ApiState>>,
    Path(kind): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.catalog.fetch_all(kind, query.search.as_deref())))
}

async fn fetch_one_handler(
    State(state): State<Arc<ApiState>>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let kind = parse_kind(&kind)?;
    let record = state.catalog.fetch_one(kind, &id).map_err(map_catalog_error)?;
    Ok(Json(record))
}

async fn create_handler(
    State(state): State<Arc<ApiState>>,
    Path(kind): Path<String>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let kind = parse_kind(&kind)?;
    let record = state.catalog.create(kind, body).map_err(map_catalog_error)?;

    broadcast_mutation(&state, kind, ListingAction::Added, record.clone());
    Ok((StatusCode::CREATED, Json(record)))
}

async fn update_handler(
    State(state): State<Arc<ApiState>>,
    Path((kind, id)): Path<(String, String)>,
    Json(patch): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let kind = parse_kind(&kind)?;
    let record = state
        .catalog
        .update(kind, &id, patch)
        .map_err(map_catalog_error)?;

    broadcast_mutation(&state, kind, ListingAction::Updated, record.clone());
    Ok(Json(record))
}

async fn delete_handler(
    State(state): State<Arc<ApiState>>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let kind = parse_kind(&kind)?;
    let tombstone = state
        .catalog
        .delete(kind, &id)
        .map_err(map_catalog_error)?;

    broadcast_mutation(&state, kind, ListingAction::Deleted, tombstone.into_value());
    Ok(Json(serde_json::json!({ "success": true })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert!(parse_kind("romhack").is_ok());
        let err = parse_kind("savegame").unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_catalog_error_mapping() {
        let (status, _) = map_catalog_error(CatalogError::NotFound(ListingKind::Sound));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = map_catalog_error(CatalogError::Conflict {
            kind: ListingKind::Romhack,
            field: "title",
        });
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = map_catalog_error(CatalogError::Invalid("no title".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
