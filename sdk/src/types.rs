//! Board items, focus descriptors and live events
//!
//! All types serialize with camelCase field names, which is the wire format
//! viewers and automation clients use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::BoardError;

/// Discriminator selecting an item's payload schema and default presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKind {
    Sticky,
    Todo,
    AgentOutput,
    LabResult,
    DashboardComponent,
    EhrRecord,
    Text,
}

impl ItemKind {
    /// Every known kind, in declaration order
    pub const ALL: [ItemKind; 7] = [
        ItemKind::Sticky,
        ItemKind::Todo,
        ItemKind::AgentOutput,
        ItemKind::LabResult,
        ItemKind::DashboardComponent,
        ItemKind::EhrRecord,
        ItemKind::Text,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Sticky => "sticky",
            ItemKind::Todo => "todo",
            ItemKind::AgentOutput => "agent-output",
            ItemKind::LabResult => "lab-result",
            ItemKind::DashboardComponent => "dashboard-component",
            ItemKind::EhrRecord => "ehr-record",
            ItemKind::Text => "text",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = BoardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ItemKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                let valid: Vec<&str> = ItemKind::ALL.iter().map(|k| k.as_str()).collect();
                BoardError::Validation(format!(
                    "Invalid kind '{}'. Must be one of: {}",
                    wanted,
                    valid.join(", ")
                ))
            })
    }
}

/// Axis-aligned rectangle on the board plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Two rectangles overlap unless one lies entirely to the left, right,
    /// above or below the other. Shared edges do not count as overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        let separated = self.right() <= other.x
            || other.right() <= self.x
            || self.bottom() <= other.y
            || other.bottom() <= self.y;
        !separated
    }
}

/// Cosmetic presentation of an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Style {
    pub color: String,
    #[serde(default)]
    pub rotation: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            color: "#ffffff".to_string(),
            rotation: 0.0,
        }
    }
}

/// A positioned, typed, sized unit of content on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub kind: ItemKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub style: Style,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Bounding box of the item
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Partial style supplied by a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylePatch {
    pub color: Option<String>,
    pub rotation: Option<f64>,
}

/// Create request: a kind plus whatever the caller chose to declare
///
/// `kind` is optional at the type level so a missing discriminator reaches the
/// store and is rejected as a validation error instead of a decode failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub kind: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub payload: Option<serde_json::Value>,
    pub style: Option<StylePatch>,
}

impl NewItem {
    pub fn of_kind(kind: ItemKind) -> Self {
        Self {
            kind: Some(kind.as_str().to_string()),
            ..Default::default()
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn sized(mut self, width: f64, height: f64) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Partial update: only supplied fields change
///
/// `id`, `kind` and the timestamps are not patchable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub payload: Option<serde_json::Value>,
    pub style: Option<StylePatch>,
}

/// What happened to the item carried by an `item-changed` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemAction {
    Created,
    Updated,
    Deleted,
}

/// Effective camera options carried by a focus event
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusOptions {
    pub zoom: f64,
    pub highlight: bool,
    pub duration_ms: u64,
    pub scroll_into_view: bool,
}

/// Caller-supplied focus options, layered over the defaults
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusOptionsPatch {
    pub zoom: Option<f64>,
    pub highlight: Option<bool>,
    pub duration_ms: Option<u64>,
    pub scroll_into_view: Option<bool>,
}

/// Focus request as received from a client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusRequest {
    pub item_id: Option<String>,
    pub sub_path: Option<String>,
    pub options: Option<FocusOptionsPatch>,
}

impl FocusRequest {
    pub fn item(item_id: impl Into<String>) -> Self {
        Self {
            item_id: Some(item_id.into()),
            ..Default::default()
        }
    }

    pub fn with_sub_path(mut self, sub_path: impl Into<String>) -> Self {
        self.sub_path = Some(sub_path.into());
        self
    }

    pub fn with_options(mut self, options: FocusOptionsPatch) -> Self {
        self.options = Some(options);
        self
    }
}

/// Accepted focus directive, broadcast to viewers and echoed to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusEvent {
    pub item_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
    pub options: FocusOptions,
    pub timestamp: DateTime<Utc>,
}

/// Events pushed to live viewers
///
/// Wire form is `{"type": "<kebab-case name>", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum BoardEvent {
    /// First event on every live connection
    #[serde(rename_all = "camelCase")]
    Connected {
        subscriber_id: u64,
        timestamp: DateTime<Utc>,
    },
    /// An item was created, updated or deleted
    ItemChanged { action: ItemAction, item: Item },
    /// A viewer should move its camera
    Focus(FocusEvent),
    /// Keep-alive, carries nothing meaningful
    Ping { timestamp: DateTime<Utc> },
}

impl BoardEvent {
    /// Event name used on the wire and as the SSE event field
    pub fn name(&self) -> &'static str {
        match self {
            BoardEvent::Connected { .. } => "connected",
            BoardEvent::ItemChanged { .. } => "item-changed",
            BoardEvent::Focus(_) => "focus",
            BoardEvent::Ping { .. } => "ping",
        }
    }
}
