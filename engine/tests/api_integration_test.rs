//! Integration tests for the HTTP boundary
//!
//! Drive the router in-process with `tower::ServiceExt::oneshot` and check
//! status codes, headers, bodies and what live viewers receive.

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use pinboard_engine::api::{router, AppState, DEGRADED_HEADER, PERSISTED_HEADER};
use pinboard_engine::hub::BroadcastHub;
use pinboard_engine::placement::PlacementEngine;
use pinboard_engine::storage::Persistence;
use sdk::types::{BoardEvent, Item};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app_with(persistence: Persistence) -> (Router, AppState) {
    let state = AppState::new(
        persistence,
        PlacementEngine::default(),
        Arc::new(BroadcastHub::default()),
    );
    (router(state.clone()), state)
}

fn app() -> (Router, AppState) {
    app_with(Persistence::in_memory())
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create(app: &Router, body: Value) -> Item {
    let response = app
        .clone()
        .oneshot(json_request("POST", "/api/items", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    serde_json::from_value(body_json(response).await).unwrap()
}

#[tokio::test]
async fn test_create_then_list() {
    let (app, _state) = app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/items",
            json!({ "kind": "sticky", "width": 150, "height": 150 }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()[PERSISTED_HEADER], "true");
    let created: Item = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(created.width, 150.0);

    let response = app
        .oneshot(empty_request("GET", "/api/items"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[DEGRADED_HEADER], "false");
    let items: Vec<Item> = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(items, vec![created]);
}

#[tokio::test]
async fn test_create_without_kind_is_400_with_hint() {
    let (app, state) = app();

    let response = app
        .oneshot(json_request("POST", "/api/items", json!({ "x": 1, "y": 2 })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("kind"));
    assert!(body["hint"].is_string());
    assert_eq!(state.hub.stats().published, 0);
}

#[tokio::test]
async fn test_malformed_json_is_400() {
    let (app, _state) = app();

    let request = Request::builder()
        .method("POST")
        .uri("/api/items")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn test_patch_and_delete() {
    let (app, _state) = app();
    let item = create(&app, json!({ "kind": "text", "x": 10, "y": 10 })).await;

    let response = app
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/api/items/{}", item.id),
            json!({ "x": 500, "style": { "color": "#123456" } }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let updated: Item = serde_json::from_value(body_json(response).await).unwrap();
    assert_eq!(updated.x, 500.0);
    assert_eq!(updated.y, 10.0);
    assert_eq!(updated.style.color, "#123456");

    let response = app
        .clone()
        .oneshot(empty_request("DELETE", &format!("/api/items/{}", item.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "deleted": item.id }));

    let response = app
        .oneshot(empty_request("GET", &format!("/api/items/{}", item.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_id_is_404() {
    let (app, _state) = app();

    for (method, body) in [("PATCH", json!({ "x": 1 })), ("DELETE", json!({}))] {
        let response = app
            .clone()
            .oneshot(json_request(method, "/api/items/ghost", body))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}

#[tokio::test]
async fn test_focus_is_accepted_and_broadcast() {
    let (app, state) = app();
    let mut viewer = state.hub.subscribe();
    viewer.recv().await;

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/focus",
            json!({
                "itemId": "x",
                "subPath": "medications.methotrexate",
                "options": { "zoom": 1.8 }
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let ack = body_json(response).await;
    assert_eq!(ack["options"]["zoom"], 1.8);
    assert_eq!(ack["options"]["highlight"], true);

    match viewer.recv().await {
        Some(BoardEvent::Focus(event)) => {
            assert_eq!(event.item_id, "x");
            assert_eq!(event.sub_path.as_deref(), Some("medications.methotrexate"));
        }
        other => panic!("expected focus event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_focus_without_item_id_is_400() {
    let (app, state) = app();

    let response = app
        .oneshot(json_request("POST", "/api/focus", json!({ "subPath": "a.b" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(state.hub.stats().published, 0);
}

#[tokio::test]
async fn test_unconfigured_storage_is_flagged() {
    let (app, _state) = app_with(Persistence::unconfigured());

    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/items"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[DEGRADED_HEADER], "true");
    let sample: Vec<Item> = serde_json::from_value(body_json(response).await).unwrap();
    assert!(!sample.is_empty());

    let response = app
        .oneshot(json_request("POST", "/api/items", json!({ "kind": "sticky" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()[PERSISTED_HEADER], "false");
}

#[tokio::test]
async fn test_status_reports_backend_and_counters() {
    let (app, state) = app();
    let _viewer = state.hub.subscribe();
    create(&app, json!({ "kind": "sticky" })).await;

    let response = app
        .oneshot(empty_request("GET", "/api/status"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let status = body_json(response).await;
    assert_eq!(status["backend"], "memory");
    assert_eq!(status["subscribers"], 1);
    assert_eq!(status["published"], 1);
    assert_eq!(status["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_sse_stream_opens_with_event_stream_content_type() {
    let (app, state) = app();

    let response = app
        .oneshot(empty_request("GET", "/api/events"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    assert_eq!(state.hub.subscriber_count(), 1);
}

#[tokio::test]
async fn test_sse_frames_are_named_by_event_type() {
    use futures::StreamExt;

    let (app, _state) = app();
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/api/events"))
        .await
        .unwrap();
    let mut body = response.into_body().into_data_stream();

    let first = body.next().await.unwrap().unwrap();
    let first = String::from_utf8(first.to_vec()).unwrap();
    assert!(first.contains("event: connected"), "got {:?}", first);

    create(&app, json!({ "kind": "sticky" })).await;

    let next = body.next().await.unwrap().unwrap();
    let next = String::from_utf8(next.to_vec()).unwrap();
    assert!(next.contains("event: item-changed"), "got {:?}", next);
    assert!(next.contains("\"action\":\"created\""), "got {:?}", next);
}
