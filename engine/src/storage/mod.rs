//! Persistence adapter
//!
//! The item collection is stored and replaced as one ordered document. Upper
//! layers talk to `Persistence`, which wraps whichever `ItemBackend` is active
//! and reports what actually happened:
//!
//! - `read` returns `ReadOutcome::Fresh` from the backend, or
//!   `ReadOutcome::Degraded` with fallback data when it is missing or unreachable.
//! - `write` returns `WriteOutcome::Persisted` or `WriteOutcome::Failed`; a failed
//!   write never fails the request that triggered it.
//!
//! Fallback data is the last collection this process read or wrote, or the
//! sample board from `seed::sample_items` when there is none yet.
//!
//! A mutation whose read falls back still writes the whole collection. In a
//! fresh process that has not read the backend yet, the fallback is the
//! sample board, so if the read fails and the write then succeeds the sample
//! items are stored in the backend together with the change.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sdk::errors::BoardError;
use sdk::types::Item;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::StorageConfig;

pub mod file;
pub mod memory;
pub mod seed;
pub mod sqlite;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// Read/write contract every backing store implements
#[async_trait]
pub trait ItemBackend: Send + Sync {
    /// Short backend name for logs and diagnostics
    fn name(&self) -> &'static str;

    /// Read the full collection. Unreachable stores return `StorageUnavailable`.
    async fn read(&self) -> Result<Vec<Item>, BoardError>;

    /// Replace the full collection
    async fn write(&self, items: &[Item]) -> Result<(), BoardError>;
}

/// Why a read fell back or a write was not persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradedReason {
    /// No durable backend was configured or it failed to open at startup
    NotConfigured,
    /// The backend exists but the operation failed
    Unreachable(String),
}

impl std::fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DegradedReason::NotConfigured => f.write_str("no durable backend configured"),
            DegradedReason::Unreachable(msg) => write!(f, "backend unreachable: {}", msg),
        }
    }
}

/// Result of reading the collection
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Fresh(Vec<Item>),
    Degraded {
        items: Vec<Item>,
        reason: DegradedReason,
    },
}

impl ReadOutcome {
    pub fn items(&self) -> &[Item] {
        match self {
            ReadOutcome::Fresh(items) => items,
            ReadOutcome::Degraded { items, .. } => items,
        }
    }

    pub fn into_items(self) -> Vec<Item> {
        match self {
            ReadOutcome::Fresh(items) => items,
            ReadOutcome::Degraded { items, .. } => items,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ReadOutcome::Degraded { .. })
    }
}

/// Result of writing the collection
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Persisted,
    Failed(DegradedReason),
}

impl WriteOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, WriteOutcome::Persisted)
    }
}

/// Uniform get/set of the item collection over a pluggable backend
///
/// A degraded read hands back fallback data that callers may modify and write.
/// If that write succeeds it replaces whatever the backend held, so sample
/// items served before the first good read can end up persisted.
pub struct Persistence {
    backend: Option<Arc<dyn ItemBackend>>,
    last_known: RwLock<Option<Vec<Item>>>,
}

impl Persistence {
    pub fn new(backend: Arc<dyn ItemBackend>) -> Self {
        Self {
            backend: Some(backend),
            last_known: RwLock::new(None),
        }
    }

    /// Adapter with no durable backend; every read is degraded
    pub fn unconfigured() -> Self {
        Self {
            backend: None,
            last_known: RwLock::new(None),
        }
    }

    /// In-process store, mostly for tests and demos
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Name of the active backend, or `none`
    pub fn backend_name(&self) -> &'static str {
        self.backend.as_ref().map(|b| b.name()).unwrap_or("none")
    }

    /// Read the full collection, degrading to fallback data on failure
    pub async fn read(&self) -> ReadOutcome {
        let reason = match &self.backend {
            None => DegradedReason::NotConfigured,
            Some(backend) => match backend.read().await {
                Ok(items) => {
                    debug!("Read {} item(s) from {}", items.len(), backend.name());
                    *self.last_known.write().await = Some(items.clone());
                    return ReadOutcome::Fresh(items);
                }
                Err(e) => DegradedReason::Unreachable(e.to_string()),
            },
        };

        let items = self.fallback().await;
        warn!(
            "Board storage degraded ({}); serving {} fallback item(s)",
            reason,
            items.len()
        );
        ReadOutcome::Degraded { items, reason }
    }

    /// Replace the full collection; failure is reported, not raised
    pub async fn write(&self, items: &[Item]) -> WriteOutcome {
        *self.last_known.write().await = Some(items.to_vec());

        let Some(backend) = &self.backend else {
            warn!("Board change kept in memory only: no durable backend configured");
            return WriteOutcome::Failed(DegradedReason::NotConfigured);
        };

        match backend.write(items).await {
            Ok(()) => {
                debug!("Wrote {} item(s) to {}", items.len(), backend.name());
                WriteOutcome::Persisted
            }
            Err(e) => {
                warn!("Failed to persist board to {}: {}", backend.name(), e);
                WriteOutcome::Failed(DegradedReason::Unreachable(e.to_string()))
            }
        }
    }

    async fn fallback(&self) -> Vec<Item> {
        let mut last_known = self.last_known.write().await;
        last_known.get_or_insert_with(seed::sample_items).clone()
    }
}

/// Open the backend named in the storage configuration
pub async fn open_backend(config: &StorageConfig, data_dir: &Path) -> Result<Arc<dyn ItemBackend>> {
    let path = config.resolved_path(data_dir);

    let backend: Arc<dyn ItemBackend> = match config.backend.as_str() {
        "memory" => Arc::new(MemoryBackend::new()),
        "file" => Arc::new(FileBackend::new(path)),
        "sqlite" => Arc::new(
            SqliteBackend::connect(&path)
                .await
                .context("Failed to open sqlite board storage")?,
        ),
        other => anyhow::bail!("Unknown storage backend '{}'", other),
    };

    info!("Board storage backend: {}", backend.name());
    Ok(backend)
}
