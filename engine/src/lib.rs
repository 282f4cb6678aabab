//! Pinboard Engine Library
//!
//! Core of the collaborative canvas: item storage, placement, live broadcast
//! and camera focus, plus the HTTP boundary that exposes them.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Telemetry and Observability
pub mod telemetry;

/// Per-kind defaults and payload validation
pub mod kinds;

/// Collision-avoiding placement of new items
pub mod placement;

/// Persistence adapter and storage backends
pub mod storage;

/// Live event fan-out to connected viewers
pub mod hub;

/// Item create/update/delete with persist-then-broadcast
pub mod store;

/// Camera focus directives
pub mod focus;

/// HTTP, SSE and WebSocket boundary
pub mod api;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
