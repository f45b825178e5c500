//! Listing API integration tests: CRUD routes, error mapping, and the
//! one-broadcast-per-mutation contract, exercised through the full router.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use modshelf::catalog::Catalog;
use modshelf::http_server::{HttpServer, HttpServerConfig};
use modshelf::listing::WireMessage;
use modshelf::sync::StreamRegistry;

fn test_app() -> (axum::Router, Arc<Catalog>, Arc<StreamRegistry>) {
    let catalog = Arc::new(Catalog::new());
    let streams = Arc::new(StreamRegistry::new());
    let server = HttpServer::with_parts(
        HttpServerConfig::default(),
        Arc::clone(&catalog),
        Arc::clone(&streams),
    );
    (server.router(), catalog, streams)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn with_body(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let (app, _, _) = test_app();
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}

#[tokio::test]
async fn test_create_then_list() {
    let (app, _, _) = test_app();

    let response = app
        .clone()
        .oneshot(with_body("POST", "/api/romhack", &json!({"title": "Radical Red"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await;
    assert_eq!(created["title"], "Radical Red");
    assert!(created["_id"].is_string());

    let response = app.oneshot(get("/api/romhack")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = body_json(response).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_broadcasts_added() {
    let (app, _, streams) = test_app();
    let (_guard, mut rx) = streams.register();

    app.oneshot(with_body("POST", "/api/sprite", &json!({"title": "Shiny Umbreon"})))
        .await
        .unwrap();

    let raw = rx.try_recv().unwrap();
    let message = WireMessage::decode(&raw).unwrap();
    assert_eq!(message.event, "sprite:added");
    assert_eq!(message.payload["title"], "Shiny Umbreon");
}

#[tokio::test]
async fn test_update_broadcasts_updated() {
    let (app, _, streams) = test_app();

    let response = app
        .clone()
        .oneshot(with_body("POST", "/api/sound", &json!({"title": "Cry", "bpm": 90})))
        .await
        .unwrap();
    let created = body_json(response).await;
    let id = created["_id"].as_str().unwrap().to_string();

    let (_guard, mut rx) = streams.register();
    let response = app
        .clone()
        .oneshot(with_body(
            "PUT",
            &format!("/api/sound/{id}"),
            &json!({"bpm": 120}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["bpm"], 120);
    assert_eq!(updated["title"], "Cry");

    let message = WireMessage::decode(&rx.try_recv().unwrap()).unwrap();
    assert_eq!(message.event, "sound:updated");
    // The broadcast carries the full updated record, not the patch.
    assert_eq!(message.payload["title"], "Cry");
    assert_eq!(message.payload["bpm"], 120);
}

#[tokio::test]
async fn test_delete_broadcasts_tombstone() {
    let (app, _, streams) = test_app();

    let response = app
        .clone()
        .oneshot(with_body("POST", "/api/script", &json!({"title": "Nuzlocke Counter"})))
        .await
        .unwrap();
    let id = body_json(response).await["_id"].as_str().unwrap().to_string();

    let (_guard, mut rx) = streams.register();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/script/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);

    let message = WireMessage::decode(&rx.try_recv().unwrap()).unwrap();
    assert_eq!(message.event, "script:deleted");
    assert_eq!(message.payload["_id"], id.as_str());
    assert_eq!(message.payload["deleted"], true);
    assert!(message.payload.get("title").is_none());

    // The record is gone afterwards.
    let response = app.oneshot(get(&format!("/api/script/{id}"))).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_kind_is_not_found() {
    let (app, _, _) = test_app();
    let response = app.oneshot(get("/api/savegame")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_create_without_title_is_rejected_and_not_broadcast() {
    let (app, _, streams) = test_app();
    let (_guard, mut rx) = streams.register();

    let response = app
        .oneshot(with_body("POST", "/api/romhack", &json!({"author": "anon"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_duplicate_title_is_conflict() {
    let (app, _, _) = test_app();

    app.clone()
        .oneshot(with_body("POST", "/api/romhack", &json!({"title": "Unbound"})))
        .await
        .unwrap();
    let response = app
        .oneshot(with_body("POST", "/api/romhack", &json!({"title": "Unbound"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_search_filters_listings() {
    let (app, _, _) = test_app();

    for title in ["Radical Red", "Emerald Kaizo"] {
        app.clone()
            .oneshot(with_body("POST", "/api/romhack", &json!({"title": title})))
            .await
            .unwrap();
    }

    let response = app.oneshot(get("/api/romhack?search=radical")).await.unwrap();
    let listed = body_json(response).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["title"], "Radical Red");
}

#[tokio::test]
async fn test_sse_endpoint_serves_event_stream() {
    let (app, _, _) = test_app();
    let response = app.oneshot(get("/sse")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response.headers().get("content-type").unwrap();
    assert_eq!(content_type, "text/event-stream");
}
