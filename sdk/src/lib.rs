//! Pinboard SDK
//!
//! Shared types and errors for the Pinboard canvas board.
//! This crate is used by the engine and by any client that speaks its wire format.

/// Error types and handling
pub mod errors;

/// Board items, focus descriptors and live events
pub mod types;

// Re-export commonly used types
pub use errors::{BoardError, BoardErrorExt};
pub use types::{
    BoardEvent, FocusEvent, FocusOptions, FocusOptionsPatch, FocusRequest, Item, ItemAction,
    ItemKind, ItemPatch, NewItem, Rect, Style, StylePatch,
};
