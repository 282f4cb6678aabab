//! Sample board
//!
//! Served when the durable backend cannot be read and this process has no
//! collection of its own yet. Ids are stable and the items do not overlap.

use chrono::{DateTime, Utc};
use sdk::types::{Item, ItemKind, Style};
use serde_json::{json, Value};

use crate::kinds::policy;

fn sample(id: &str, kind: ItemKind, x: f64, y: f64, payload: Value) -> Item {
    let entry = policy(kind);
    let seeded_at: DateTime<Utc> = DateTime::from_timestamp(1_704_067_200, 0).unwrap_or_default();

    Item {
        id: id.to_string(),
        kind,
        x,
        y,
        width: entry.default_width,
        height: entry.height_for(&payload),
        payload,
        style: Style {
            color: entry.default_color.to_string(),
            rotation: 0.0,
        },
        created_at: seeded_at,
        updated_at: seeded_at,
    }
}

/// The documented fallback item set
pub fn sample_items() -> Vec<Item> {
    vec![
        sample(
            "sample-welcome",
            ItemKind::Sticky,
            80.0,
            80.0,
            json!({ "text": "Welcome to the board. Items added by agents appear here." }),
        ),
        sample(
            "sample-todo",
            ItemKind::Todo,
            320.0,
            80.0,
            json!({
                "title": "Morning round",
                "items": [
                    { "text": "Review overnight labs", "status": "done" },
                    { "text": "Reconcile medications", "status": "in-progress" },
                    { "text": "Call pharmacy", "status": "pending" },
                    { "text": "Update care plan", "status": "pending" }
                ]
            }),
        ),
        sample(
            "sample-labs",
            ItemKind::LabResult,
            680.0,
            80.0,
            json!({
                "test": "ALT",
                "value": 62,
                "unit": "U/L",
                "range": { "min": 7, "max": 56 },
                "status": "high"
            }),
        ),
        sample(
            "sample-ehr",
            ItemKind::EhrRecord,
            80.0,
            360.0,
            json!({
                "patient": "Demo Patient",
                "severity": "moderate",
                "sections": {
                    "medications": {
                        "methotrexate": { "dose": "15 mg", "frequency": "weekly" },
                        "folic-acid": { "dose": "1 mg", "frequency": "daily" }
                    },
                    "allergies": { "penicillin": { "reaction": "rash" } }
                }
            }),
        ),
        sample(
            "sample-agent",
            ItemKind::AgentOutput,
            640.0,
            360.0,
            json!({
                "agent": "summarizer",
                "content": "Liver enzymes mildly elevated.\nOn weekly methotrexate.\nSuggest repeat panel in 2 weeks."
            }),
        ),
    ]
}
