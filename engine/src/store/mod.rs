//! Item store
//!
//! Mediates every create, update and delete of board items:
//!
//! 1. validate the request
//! 2. read the full collection through the persistence adapter
//! 3. mutate it in memory (placing new items first)
//! 4. write the full collection back
//! 5. broadcast an `item-changed` event
//!
//! Writes are serialized inside this process so concurrent requests cannot
//! lose each other's changes. Another process sharing the same backend still
//! races with whole-document last-writer-wins.
//!
//! A failed write does not fail the request: the change is returned and
//! broadcast, and `Committed::write` says it was not persisted.

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sdk::errors::BoardError;
use sdk::types::{BoardEvent, Item, ItemAction, ItemKind, ItemPatch, NewItem, Style, StylePatch};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::hub::BroadcastHub;
use crate::kinds::{policy, validate_color, validate_payload, validate_rotation};
use crate::placement::{Candidate, PlacementEngine, PlacementOutcome};
use crate::storage::{Persistence, ReadOutcome, WriteOutcome};

/// Outcome of a mutation: the resulting value and what happened to the write
#[derive(Debug, Clone, PartialEq)]
pub struct Committed<T> {
    pub value: T,
    pub write: WriteOutcome,
}

impl<T> Committed<T> {
    pub fn persisted(&self) -> bool {
        self.write.is_persisted()
    }
}

/// Generate `item-<unix millis>-<6 random lowercase alphanumerics>`
pub fn generate_item_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect();
    format!("item-{}-{}", Utc::now().timestamp_millis(), suffix)
}

fn check_finite(field: &str, value: f64) -> Result<f64, BoardError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(BoardError::Validation(format!("{} must be a finite number", field)))
    }
}

fn check_dimension(field: &str, value: f64) -> Result<f64, BoardError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(BoardError::Validation(format!(
            "{} must be a positive number, got {}",
            field, value
        )))
    }
}

fn check_style_patch(style: &StylePatch) -> Result<(), BoardError> {
    if let Some(color) = &style.color {
        validate_color(color)?;
    }
    if let Some(rotation) = style.rotation {
        validate_rotation(rotation)?;
    }
    Ok(())
}

fn apply_style_patch(style: &mut Style, patch: &StylePatch) {
    if let Some(color) = &patch.color {
        style.color = color.clone();
    }
    if let Some(rotation) = patch.rotation {
        style.rotation = rotation;
    }
}

/// `now`, nudged forward if the clock has not moved past `previous`
fn next_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + chrono::Duration::microseconds(1)
    }
}

/// In-memory view of all items, backed by the persistence adapter
pub struct ItemStore {
    persistence: Persistence,
    placement: PlacementEngine,
    hub: Arc<BroadcastHub>,
    write_lock: Mutex<()>,
}

impl ItemStore {
    pub fn new(persistence: Persistence, placement: PlacementEngine, hub: Arc<BroadcastHub>) -> Self {
        Self {
            persistence,
            placement,
            hub,
            write_lock: Mutex::new(()),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.persistence.backend_name()
    }

    /// Full collection with the read outcome, for callers that care about degradation
    pub async fn list_outcome(&self) -> ReadOutcome {
        self.persistence.read().await
    }

    /// Full collection in stored order
    pub async fn list(&self) -> Vec<Item> {
        self.persistence.read().await.into_items()
    }

    /// Single item by id
    pub async fn get(&self, id: &str) -> Result<Item, BoardError> {
        self.list()
            .await
            .into_iter()
            .find(|item| item.id == id)
            .ok_or_else(|| BoardError::NotFound(id.to_string()))
    }

    /// Create an item: defaults, placement, timestamps, persist, broadcast
    pub async fn create(&self, new_item: NewItem) -> Result<Committed<Item>, BoardError> {
        let kind: ItemKind = new_item
            .kind
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| BoardError::validation("kind is required"))?
            .parse()?;
        let entry = policy(kind);

        let position = match (new_item.x, new_item.y) {
            (Some(x), Some(y)) => Some((check_finite("x", x)?, check_finite("y", y)?)),
            (None, None) => None,
            _ => return Err(BoardError::validation("x and y must be supplied together")),
        };

        let payload = new_item.payload.unwrap_or_else(|| entry.default_payload());
        validate_payload(kind, &payload)?;

        let width = match new_item.width {
            Some(width) => check_dimension("width", width)?,
            None => entry.default_width,
        };
        let height = match new_item.height {
            Some(height) => check_dimension("height", height)?,
            None => entry.height_for(&payload),
        };

        let mut style = Style {
            color: entry.default_color.to_string(),
            rotation: 0.0,
        };
        if let Some(patch) = &new_item.style {
            check_style_patch(patch)?;
            apply_style_patch(&mut style, patch);
        }

        let _guard = self.write_lock.lock().await;
        let mut items = self.persistence.read().await.into_items();

        let placement = self.placement.place(
            Candidate {
                width,
                height,
                position,
            },
            &items,
        );
        if placement.outcome == PlacementOutcome::Exhausted {
            warn!(
                "No free slot for {} item after {} attempts; placing at ({}, {}) anyway",
                kind, placement.attempts, placement.x, placement.y
            );
        }

        let mut id = generate_item_id();
        while items.iter().any(|item| item.id == id) {
            id = generate_item_id();
        }

        let now = Utc::now();
        let item = Item {
            id,
            kind,
            x: placement.x,
            y: placement.y,
            width,
            height,
            payload,
            style,
            created_at: now,
            updated_at: now,
        };

        items.push(item.clone());
        let write = self.persistence.write(&items).await;
        self.broadcast(ItemAction::Created, &item);

        info!(
            "Created {} item {} at ({}, {})",
            kind, item.id, item.x, item.y
        );
        Ok(Committed { value: item, write })
    }

    /// Shallow-merge supplied fields over an existing item
    ///
    /// No re-placement: an update may move an item onto another one.
    pub async fn update(&self, id: &str, patch: ItemPatch) -> Result<Committed<Item>, BoardError> {
        let x = patch.x.map(|v| check_finite("x", v)).transpose()?;
        let y = patch.y.map(|v| check_finite("y", v)).transpose()?;
        let width = patch.width.map(|v| check_dimension("width", v)).transpose()?;
        let height = patch
            .height
            .map(|v| check_dimension("height", v))
            .transpose()?;
        if let Some(style) = &patch.style {
            check_style_patch(style)?;
        }

        let _guard = self.write_lock.lock().await;
        let mut items = self.persistence.read().await.into_items();

        let item = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| BoardError::NotFound(id.to_string()))?;

        if let Some(payload) = &patch.payload {
            validate_payload(item.kind, payload)?;
        }

        if let Some(x) = x {
            item.x = x;
        }
        if let Some(y) = y {
            item.y = y;
        }
        if let Some(width) = width {
            item.width = width;
        }
        if let Some(height) = height {
            item.height = height;
        }
        if let Some(payload) = patch.payload {
            item.payload = payload;
        }
        if let Some(style) = &patch.style {
            apply_style_patch(&mut item.style, style);
        }
        item.updated_at = next_timestamp(item.updated_at);

        let updated = item.clone();
        let write = self.persistence.write(&items).await;
        self.broadcast(ItemAction::Updated, &updated);

        info!("Updated item {}", updated.id);
        Ok(Committed {
            value: updated,
            write,
        })
    }

    /// Remove an item; the removed item is returned and broadcast
    pub async fn delete(&self, id: &str) -> Result<Committed<Item>, BoardError> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.persistence.read().await.into_items();

        let index = items
            .iter()
            .position(|item| item.id == id)
            .ok_or_else(|| BoardError::NotFound(id.to_string()))?;
        let removed = items.remove(index);

        let write = self.persistence.write(&items).await;
        self.broadcast(ItemAction::Deleted, &removed);

        info!("Deleted item {}", removed.id);
        Ok(Committed {
            value: removed,
            write,
        })
    }

    fn broadcast(&self, action: ItemAction, item: &Item) {
        self.hub.publish(BoardEvent::ItemChanged {
            action,
            item: item.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placement::WorkingBounds;
    use serde_json::json;

    fn store() -> (ItemStore, Arc<BroadcastHub>) {
        let hub = Arc::new(BroadcastHub::default());
        let store = ItemStore::new(
            Persistence::in_memory(),
            PlacementEngine::default(),
            Arc::clone(&hub),
        );
        (store, hub)
    }

    #[tokio::test]
    async fn test_create_on_empty_board() {
        let (store, _hub) = store();
        let created = store
            .create(NewItem::of_kind(ItemKind::Sticky).sized(150.0, 150.0))
            .await
            .unwrap();
        let item = created.value;

        assert!(created.write.is_persisted());
        assert!(item.id.starts_with("item-"));
        assert_eq!(item.created_at, item.updated_at);
        assert!(WorkingBounds::default().contains_point(item.x, item.y));
        assert_eq!((item.width, item.height), (150.0, 150.0));
        assert_eq!(item.style.color, "#fef08a");
        assert_eq!(item.payload, json!({ "text": "" }));
    }

    #[tokio::test]
    async fn test_create_overlapping_is_stacked() {
        let (store, _hub) = store();
        store
            .create(
                NewItem::of_kind(ItemKind::Sticky)
                    .at(100.0, 100.0)
                    .sized(200.0, 200.0),
            )
            .await
            .unwrap();

        let second = store
            .create(
                NewItem::of_kind(ItemKind::Sticky)
                    .at(150.0, 150.0)
                    .sized(100.0, 100.0),
            )
            .await
            .unwrap()
            .value;

        assert!(second.y >= 300.0);
        assert_eq!(second.x, 150.0);
    }

    #[tokio::test]
    async fn test_create_requires_kind() {
        let (store, hub) = store();

        for kind in [None, Some("".to_string()), Some("postit".to_string())] {
            let new_item = NewItem {
                kind,
                ..Default::default()
            };
            let err = store.create(new_item).await.unwrap_err();
            assert!(matches!(err, BoardError::Validation(_)));
        }
        assert!(store.list().await.is_empty());
        assert_eq!(hub.stats().published, 0);
    }

    #[tokio::test]
    async fn test_create_rejects_half_position_and_bad_size() {
        let (store, _hub) = store();
        let half = NewItem {
            x: Some(10.0),
            ..NewItem::of_kind(ItemKind::Text)
        };
        assert!(store.create(half).await.is_err());

        let zero = NewItem::of_kind(ItemKind::Text).sized(0.0, 10.0);
        assert!(store.create(zero).await.is_err());
    }

    #[tokio::test]
    async fn test_todo_height_from_payload() {
        let (store, _hub) = store();
        let payload = json!({
            "title": "Rounds",
            "items": [
                { "text": "a", "status": "done" },
                { "text": "b", "status": "pending" },
                { "text": "c", "status": "pending" }
            ]
        });

        let item = store
            .create(NewItem::of_kind(ItemKind::Todo).with_payload(payload))
            .await
            .unwrap()
            .value;

        assert_eq!(item.height, 80.0 + 3.0 * 36.0);
        assert_eq!(item.width, 320.0);
    }

    #[tokio::test]
    async fn test_update_changes_only_supplied_fields() {
        let (store, _hub) = store();
        let original = store
            .create(NewItem::of_kind(ItemKind::Sticky).at(10.0, 20.0))
            .await
            .unwrap()
            .value;

        let patch = ItemPatch {
            height: Some(300.0),
            ..Default::default()
        };
        let updated = store.update(&original.id, patch).await.unwrap().value;

        assert_eq!(updated.height, 300.0);
        assert!(updated.updated_at > original.updated_at);
        assert_eq!(
            Item {
                height: original.height,
                updated_at: original.updated_at,
                ..updated.clone()
            },
            original
        );
        assert_eq!(store.get(&original.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_update_merges_style_fields() {
        let (store, _hub) = store();
        let original = store
            .create(NewItem::of_kind(ItemKind::Sticky))
            .await
            .unwrap()
            .value;

        let patch = ItemPatch {
            style: Some(StylePatch {
                rotation: Some(-4.0),
                color: None,
            }),
            ..Default::default()
        };
        let updated = store.update(&original.id, patch).await.unwrap().value;

        assert_eq!(updated.style.rotation, -4.0);
        assert_eq!(updated.style.color, original.style.color);
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_id() {
        let (store, hub) = store();
        store
            .create(NewItem::of_kind(ItemKind::Sticky))
            .await
            .unwrap();
        let before = store.list().await;
        let published = hub.stats().published;

        let err = store
            .update("ghost", ItemPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BoardError::NotFound(_)));

        let err = store.delete("ghost").await.unwrap_err();
        assert!(matches!(err, BoardError::NotFound(_)));

        assert_eq!(store.list().await, before);
        assert_eq!(hub.stats().published, published);
    }

    #[tokio::test]
    async fn test_delete_removes_and_broadcasts() {
        let (store, hub) = store();
        let mut viewer = hub.subscribe();
        viewer.recv().await;

        let item = store
            .create(NewItem::of_kind(ItemKind::Text))
            .await
            .unwrap()
            .value;
        viewer.recv().await;

        let removed = store.delete(&item.id).await.unwrap().value;
        assert_eq!(removed, item);
        assert!(store.list().await.is_empty());

        match viewer.recv().await {
            Some(BoardEvent::ItemChanged { action, item }) => {
                assert_eq!(action, ItemAction::Deleted);
                assert_eq!(item.id, removed.id);
            }
            other => panic!("expected item-changed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_is_idempotent() {
        let (store, _hub) = store();
        for _ in 0..3 {
            store
                .create(NewItem::of_kind(ItemKind::Sticky))
                .await
                .unwrap();
        }

        let first = store.list().await;
        assert_eq!(first.len(), 3);
        assert_eq!(store.list().await, first);
    }

    #[tokio::test]
    async fn test_invalid_payload_rejected() {
        let (store, _hub) = store();
        let bad = NewItem::of_kind(ItemKind::LabResult)
            .with_payload(json!({ "status": "bad", "range": { "min": 1, "max": 2 } }));

        assert!(matches!(
            store.create(bad).await,
            Err(BoardError::Validation(_))
        ));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let ids: std::collections::HashSet<String> =
            (0..500).map(|_| generate_item_id()).collect();
        assert_eq!(ids.len(), 500);
    }
}
