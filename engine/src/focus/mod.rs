//! Focus router
//!
//! Turns a focus request into a broadcast directive that moves every viewer's
//! camera to an item, or to a named region inside it (`subPath`, e.g.
//! `medications.methotrexate`).
//!
//! The router only addresses. It never checks that the item or region exists;
//! viewers resolve the target and report "not found" themselves.

use chrono::Utc;
use sdk::errors::BoardError;
use sdk::types::{BoardEvent, FocusEvent, FocusOptions, FocusOptionsPatch, FocusRequest};
use std::sync::Arc;
use tracing::info;

use crate::hub::BroadcastHub;

/// Zoom for whole-item focus
pub const WHOLE_ITEM_ZOOM: f64 = 1.0;

/// Zoom for sub-element focus
pub const SUB_ELEMENT_ZOOM: f64 = 1.6;

/// Camera animation length, regardless of target
pub const DEFAULT_DURATION_MS: u64 = 2000;

/// Accepted zoom range
pub const MIN_ZOOM: f64 = 0.1;
pub const MAX_ZOOM: f64 = 10.0;

/// Longest accepted camera animation
pub const MAX_DURATION_MS: u64 = 60_000;

/// Defaults for a target, before caller options are applied
pub fn default_options(has_sub_path: bool) -> FocusOptions {
    if has_sub_path {
        FocusOptions {
            zoom: SUB_ELEMENT_ZOOM,
            highlight: true,
            duration_ms: DEFAULT_DURATION_MS,
            scroll_into_view: true,
        }
    } else {
        FocusOptions {
            zoom: WHOLE_ITEM_ZOOM,
            highlight: false,
            duration_ms: DEFAULT_DURATION_MS,
            scroll_into_view: false,
        }
    }
}

/// Layer caller options over the defaults, field by field
pub fn effective_options(has_sub_path: bool, patch: Option<&FocusOptionsPatch>) -> FocusOptions {
    let defaults = default_options(has_sub_path);
    let Some(patch) = patch else {
        return defaults;
    };

    FocusOptions {
        zoom: patch.zoom.unwrap_or(defaults.zoom),
        highlight: patch.highlight.unwrap_or(defaults.highlight),
        duration_ms: patch.duration_ms.unwrap_or(defaults.duration_ms),
        scroll_into_view: patch.scroll_into_view.unwrap_or(defaults.scroll_into_view),
    }
}

/// Normalize a sub-path: trimmed, every dot-separated segment non-blank.
/// Blank input means "whole item".
pub fn normalize_sub_path(raw: Option<&str>) -> Result<Option<String>, BoardError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    let segments: Vec<&str> = raw.split('.').map(str::trim).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(BoardError::Validation(format!(
            "Invalid subPath '{}'. Segments must not be empty",
            raw
        )));
    }

    Ok(Some(segments.join(".")))
}

fn validate_options(options: &FocusOptions) -> Result<(), BoardError> {
    if !options.zoom.is_finite() || !(MIN_ZOOM..=MAX_ZOOM).contains(&options.zoom) {
        return Err(BoardError::Validation(format!(
            "Invalid zoom {}. Must be between {} and {}",
            options.zoom, MIN_ZOOM, MAX_ZOOM
        )));
    }
    if options.duration_ms > MAX_DURATION_MS {
        return Err(BoardError::Validation(format!(
            "Invalid durationMs {}. Must be at most {}",
            options.duration_ms, MAX_DURATION_MS
        )));
    }
    Ok(())
}

/// Validates focus requests and hands them to the hub
pub struct FocusRouter {
    hub: Arc<BroadcastHub>,
}

impl FocusRouter {
    pub fn new(hub: Arc<BroadcastHub>) -> Self {
        Self { hub }
    }

    /// Build the focus directive without publishing it
    pub fn resolve(&self, request: &FocusRequest) -> Result<FocusEvent, BoardError> {
        let item_id = request
            .item_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| BoardError::validation("itemId is required"))?;

        let sub_path = normalize_sub_path(request.sub_path.as_deref())?;
        let options = effective_options(sub_path.is_some(), request.options.as_ref());
        validate_options(&options)?;

        Ok(FocusEvent {
            item_id: item_id.to_string(),
            sub_path,
            options,
            timestamp: Utc::now(),
        })
    }

    /// Validate, publish one `focus` event, and return it as acknowledgment
    pub fn focus(&self, request: &FocusRequest) -> Result<FocusEvent, BoardError> {
        let event = self.resolve(request)?;

        let delivered = self.hub.publish(BoardEvent::Focus(event.clone()));
        info!(
            "Focus on {}{} sent to {} viewer(s)",
            event.item_id,
            event
                .sub_path
                .as_deref()
                .map(|p| format!(" ({})", p))
                .unwrap_or_default(),
            delivered
        );

        Ok(event)
    }
}
