//! HTTP boundary
//!
//! REST endpoints for items and focus, plus two live transports over the same
//! broadcast hub: Server-Sent Events and WebSocket.
//!
//! # Endpoints
//!
//! - GET /api/items - List all items
//! - POST /api/items - Create an item
//! - GET /api/items/:id - Get one item
//! - PATCH /api/items/:id - Update an item
//! - DELETE /api/items/:id - Delete an item
//! - POST /api/focus - Broadcast a focus directive
//! - GET /api/events - Live events over SSE
//! - GET /ws - Live events over WebSocket
//! - GET /api/status - Backend and hub diagnostics

use anyhow::{Context, Result};
use axum::{
    extract::{
        rejection::JsonRejection,
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use futures::stream::{Stream, StreamExt};
use sdk::errors::{BoardError, BoardErrorExt};
use sdk::types::{FocusRequest, ItemPatch, NewItem};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::focus::FocusRouter;
use crate::hub::BroadcastHub;
use crate::placement::PlacementEngine;
use crate::storage::{open_backend, Persistence};
use crate::store::{Committed, ItemStore};

/// Set on mutating responses: whether the change reached durable storage
pub const PERSISTED_HEADER: &str = "x-pinboard-persisted";

/// Set on list responses: whether fallback data was served
pub const DEGRADED_HEADER: &str = "x-pinboard-degraded";

fn flag(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ItemStore>,
    pub focus: Arc<FocusRouter>,
    pub hub: Arc<BroadcastHub>,
}

impl AppState {
    pub fn new(persistence: Persistence, placement: PlacementEngine, hub: Arc<BroadcastHub>) -> Self {
        Self {
            store: Arc::new(ItemStore::new(persistence, placement, Arc::clone(&hub))),
            focus: Arc::new(FocusRouter::new(Arc::clone(&hub))),
            hub,
        }
    }

    /// Wire store, router and hub from configuration
    ///
    /// A backend that fails to open is logged and the board runs without
    /// durable storage rather than refusing to start.
    pub async fn from_config(config: &Config) -> Self {
        let persistence = match open_backend(&config.storage, &config.core.data_dir).await {
            Ok(backend) => Persistence::new(backend),
            Err(e) => {
                warn!("Storage backend unavailable, running without persistence: {:#}", e);
                Persistence::unconfigured()
            }
        };

        let placement = PlacementEngine::new(config.canvas.bounds(), config.canvas.gap);
        let hub = Arc::new(BroadcastHub::from_config(&config.live));
        Self::new(persistence, placement, hub)
    }
}

/// Error response: `{"error": ..., "hint": ...}` with a status from the error kind
#[derive(Debug)]
pub struct ApiError(pub BoardError);

impl From<BoardError> for ApiError {
    fn from(err: BoardError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(BoardError::Validation(rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BoardError::Validation(_) => StatusCode::BAD_REQUEST,
            BoardError::NotFound(_) => StatusCode::NOT_FOUND,
            BoardError::StorageUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        } else {
            debug!("Request rejected: {}", self.0);
        }

        (
            status,
            Json(json!({
                "error": self.0.to_string(),
                "hint": self.0.user_hint(),
            })),
        )
            .into_response()
    }
}

fn committed<T: serde::Serialize>(status: StatusCode, committed: Committed<T>) -> Response {
    let persisted = committed.persisted();
    (
        status,
        [(PERSISTED_HEADER, flag(persisted))],
        Json(committed.value),
    )
        .into_response()
}

/// Build the router with all endpoints
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/items", get(list_items).post(create_item))
        .route(
            "/api/items/:id",
            get(get_item).patch(update_item).delete(delete_item),
        )
        .route("/api/focus", post(focus_item))
        .route("/api/events", get(events_handler))
        .route("/ws", get(websocket_handler))
        .route("/api/status", get(status_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until Ctrl+C
pub async fn serve(config: &Config, state: AppState) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| {
            format!(
                "Invalid listen address {}:{}",
                config.server.host, config.server.port
            )
        })?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!(
        "Board server listening on http://{} (storage: {})",
        addr,
        state.store.backend_name()
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("Board server shutting down gracefully");
        })
        .await
        .context("Board server error")?;

    Ok(())
}

async fn list_items(State(state): State<AppState>) -> Response {
    let outcome = state.store.list_outcome().await;
    let degraded = outcome.is_degraded();
    (
        [(DEGRADED_HEADER, flag(degraded))],
        Json(outcome.into_items()),
    )
        .into_response()
}

async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let item = state.store.get(&id).await?;
    Ok(Json(item).into_response())
}

async fn create_item(
    State(state): State<AppState>,
    payload: Result<Json<NewItem>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(new_item) = payload?;
    let created = state.store.create(new_item).await?;
    Ok(committed(StatusCode::CREATED, created))
}

async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ItemPatch>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(patch) = payload?;
    let updated = state.store.update(&id, patch).await?;
    Ok(committed(StatusCode::OK, updated))
}

async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let deleted = state.store.delete(&id).await?;
    let persisted = deleted.persisted();
    Ok((
        [(PERSISTED_HEADER, flag(persisted))],
        Json(json!({ "deleted": deleted.value.id })),
    )
        .into_response())
}

async fn focus_item(
    State(state): State<AppState>,
    payload: Result<Json<FocusRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let event = state.focus.focus(&request)?;
    Ok((StatusCode::ACCEPTED, Json(event)).into_response())
}

/// Server-Sent Events: one SSE event per board event, named by its type
async fn events_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let subscription = state.hub.subscribe();
    debug!("SSE viewer {} attached", subscription.id());

    let stream = subscription
        .into_stream()
        .map(|event| Event::default().event(event.name()).json_data(&event));

    Sse::new(stream)
}

async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

/// Forward hub events as JSON text frames until either side goes away
async fn handle_websocket(mut socket: WebSocket, state: AppState) {
    let mut subscription = state.hub.subscribe();
    let id = subscription.id();
    debug!("WebSocket viewer {} attached", id);

    loop {
        tokio::select! {
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!("WebSocket viewer {} error: {}", id, e);
                        break;
                    }
                }
            }
            event = subscription.recv() => {
                let Some(event) = event else { break };
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("Failed to encode {} event: {}", event.name(), e);
                        continue;
                    }
                };
                if socket.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    }

    state.hub.unsubscribe(id);
}

async fn status_handler(State(state): State<AppState>) -> Response {
    let stats = state.hub.stats();
    Json(json!({
        "backend": state.store.backend_name(),
        "subscribers": stats.subscribers,
        "published": stats.published,
        "version": env!("CARGO_PKG_VERSION"),
        "commit": env!("GIT_COMMIT_HASH"),
    }))
    .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (BoardError::validation("bad"), StatusCode::BAD_REQUEST),
            (BoardError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                BoardError::StorageUnavailable("down".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                BoardError::Config("broken".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_flag_values() {
        assert_eq!(flag(true), "true");
        assert_eq!(flag(false), "false");
    }
}
