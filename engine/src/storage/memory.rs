//! In-process backend
//!
//! Holds the collection in memory for the lifetime of the process.

use async_trait::async_trait;
use sdk::errors::BoardError;
use sdk::types::Item;
use tokio::sync::RwLock;

use super::ItemBackend;

/// Backend that never touches disk
#[derive(Default)]
pub struct MemoryBackend {
    items: RwLock<Vec<Item>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing collection
    pub fn with_items(items: Vec<Item>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }
}

#[async_trait]
impl ItemBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn read(&self) -> Result<Vec<Item>, BoardError> {
        Ok(self.items.read().await.clone())
    }

    async fn write(&self, items: &[Item]) -> Result<(), BoardError> {
        *self.items.write().await = items.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::seed::sample_items;

    #[tokio::test]
    async fn test_write_replaces_collection() {
        let backend = MemoryBackend::with_items(sample_items());
        assert_eq!(backend.read().await.unwrap().len(), sample_items().len());

        backend.write(&[]).await.unwrap();
        assert!(backend.read().await.unwrap().is_empty());
    }
}
