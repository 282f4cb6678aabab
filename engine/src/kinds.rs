//! Per-kind presentation policy
//!
//! Each item kind registers default size, color and payload, and optionally a
//! rule deriving display height from payload length. The table is indexed by
//! the kind's declaration order in `ItemKind::ALL`.
//!
//! Payload validation lives here too: a handful of kinds carry enumerated tags
//! or numeric ranges the viewer relies on.

use regex::Regex;
use sdk::errors::BoardError;
use sdk::types::ItemKind;
use serde_json::{json, Value};
use std::sync::OnceLock;

/// Height derived from the number of entries in the payload
#[derive(Clone, Copy)]
pub struct HeightRule {
    pub base: f64,
    pub per_entry: f64,
    pub min: f64,
    pub max: f64,
    count: fn(&Value) -> usize,
}

impl HeightRule {
    /// Height for a payload, clamped to `[min, max]`
    pub fn height_for(&self, payload: &Value) -> f64 {
        let entries = (self.count)(payload) as f64;
        (self.base + self.per_entry * entries).clamp(self.min, self.max)
    }
}

/// Defaults applied when a create request omits a field
#[derive(Clone, Copy)]
pub struct KindPolicy {
    pub kind: ItemKind,
    pub default_width: f64,
    pub default_height: f64,
    pub default_color: &'static str,
    pub height_rule: Option<HeightRule>,
    default_payload: fn() -> Value,
}

impl KindPolicy {
    pub fn default_payload(&self) -> Value {
        (self.default_payload)()
    }

    /// Height to use when the caller did not declare one
    pub fn height_for(&self, payload: &Value) -> f64 {
        match &self.height_rule {
            Some(rule) => rule.height_for(payload),
            None => self.default_height,
        }
    }
}

fn todo_entries(payload: &Value) -> usize {
    payload
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}

fn agent_lines(payload: &Value) -> usize {
    if let Some(lines) = payload.get("lines").and_then(Value::as_array) {
        return lines.len();
    }
    payload
        .get("content")
        .and_then(Value::as_str)
        .map(|content| content.lines().count())
        .unwrap_or(0)
}

fn sticky_payload() -> Value {
    json!({ "text": "" })
}

fn todo_payload() -> Value {
    json!({ "title": "To do", "items": [] })
}

fn agent_payload() -> Value {
    json!({ "agent": "assistant", "content": "" })
}

fn lab_payload() -> Value {
    json!({ "test": "", "value": null, "unit": "", "status": "normal" })
}

fn dashboard_payload() -> Value {
    json!({ "component": "", "props": {} })
}

fn ehr_payload() -> Value {
    json!({ "patient": "", "sections": {} })
}

fn text_payload() -> Value {
    json!({ "text": "" })
}

static POLICIES: [KindPolicy; 7] = [
    KindPolicy {
        kind: ItemKind::Sticky,
        default_width: 200.0,
        default_height: 200.0,
        default_color: "#fef08a",
        height_rule: None,
        default_payload: sticky_payload,
    },
    KindPolicy {
        kind: ItemKind::Todo,
        default_width: 320.0,
        default_height: 120.0,
        default_color: "#e0f2fe",
        height_rule: Some(HeightRule {
            base: 80.0,
            per_entry: 36.0,
            min: 120.0,
            max: 640.0,
            count: todo_entries,
        }),
        default_payload: todo_payload,
    },
    KindPolicy {
        kind: ItemKind::AgentOutput,
        default_width: 480.0,
        default_height: 160.0,
        default_color: "#ede9fe",
        height_rule: Some(HeightRule {
            base: 96.0,
            per_entry: 20.0,
            min: 160.0,
            max: 720.0,
            count: agent_lines,
        }),
        default_payload: agent_payload,
    },
    KindPolicy {
        kind: ItemKind::LabResult,
        default_width: 360.0,
        default_height: 220.0,
        default_color: "#dcfce7",
        height_rule: None,
        default_payload: lab_payload,
    },
    KindPolicy {
        kind: ItemKind::DashboardComponent,
        default_width: 640.0,
        default_height: 400.0,
        default_color: "#f1f5f9",
        height_rule: None,
        default_payload: dashboard_payload,
    },
    KindPolicy {
        kind: ItemKind::EhrRecord,
        default_width: 520.0,
        default_height: 360.0,
        default_color: "#fee2e2",
        height_rule: None,
        default_payload: ehr_payload,
    },
    KindPolicy {
        kind: ItemKind::Text,
        default_width: 320.0,
        default_height: 80.0,
        default_color: "#ffffff",
        height_rule: None,
        default_payload: text_payload,
    },
];

/// Policy for a kind
pub fn policy(kind: ItemKind) -> &'static KindPolicy {
    &POLICIES[kind as usize]
}

const TODO_STATUSES: [&str; 3] = ["pending", "in-progress", "done"];
const LAB_STATUSES: [&str; 4] = ["normal", "low", "high", "critical"];
const SEVERITIES: [&str; 4] = ["low", "moderate", "high", "critical"];

fn check_tag(value: Option<&Value>, field: &str, allowed: &[&str]) -> Result<(), BoardError> {
    let Some(value) = value else {
        return Ok(());
    };
    match value.as_str() {
        Some(tag) if allowed.contains(&tag) => Ok(()),
        _ => Err(BoardError::Validation(format!(
            "Invalid {} {}. Must be one of: {}",
            field,
            value,
            allowed.join(", ")
        ))),
    }
}

/// Validate enumerated tags and ranges in a kind's payload
pub fn validate_payload(kind: ItemKind, payload: &Value) -> Result<(), BoardError> {
    match kind {
        ItemKind::Todo => {
            if let Some(items) = payload.get("items") {
                let entries = items
                    .as_array()
                    .ok_or_else(|| BoardError::validation("todo items must be an array"))?;
                for entry in entries {
                    check_tag(entry.get("status"), "todo status", &TODO_STATUSES)?;
                }
            }
            Ok(())
        }
        ItemKind::LabResult => {
            check_tag(payload.get("status"), "lab status", &LAB_STATUSES)?;
            if let Some(range) = payload.get("range") {
                let min = range.get("min").and_then(Value::as_f64);
                let max = range.get("max").and_then(Value::as_f64);
                match (min, max) {
                    (Some(min), Some(max)) if min < max => {}
                    (Some(_), Some(_)) => {
                        return Err(BoardError::validation(
                            "lab range min must be less than max",
                        ))
                    }
                    _ => {
                        return Err(BoardError::validation(
                            "lab range needs numeric min and max",
                        ))
                    }
                }
            }
            Ok(())
        }
        ItemKind::EhrRecord => {
            check_tag(payload.get("severity"), "severity", &SEVERITIES)?;
            if let Some(alerts) = payload.get("alerts").and_then(Value::as_array) {
                for alert in alerts {
                    check_tag(alert.get("severity"), "severity", &SEVERITIES)?;
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn color_pattern() -> &'static Regex {
    static COLOR: OnceLock<Regex> = OnceLock::new();
    COLOR.get_or_init(|| {
        Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6})$").expect("Invalid color pattern")
    })
}

/// Colors are `#rgb` or `#rrggbb`
pub fn validate_color(color: &str) -> Result<(), BoardError> {
    if color_pattern().is_match(color) {
        Ok(())
    } else {
        Err(BoardError::Validation(format!(
            "Invalid color '{}'. Expected #rgb or #rrggbb",
            color
        )))
    }
}

/// Rotation in degrees within [-180, 180]
pub fn validate_rotation(rotation: f64) -> Result<(), BoardError> {
    if rotation.is_finite() && (-180.0..=180.0).contains(&rotation) {
        Ok(())
    } else {
        Err(BoardError::Validation(format!(
            "Invalid rotation {}. Must be between -180 and 180 degrees",
            rotation
        )))
    }
}
