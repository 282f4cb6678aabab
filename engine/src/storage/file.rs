//! JSON file backend
//!
//! The collection is a single JSON array on disk. Writes go to a sibling temp
//! file that is renamed over the target, so readers never see a half-written
//! document. A missing file is an empty board.

use async_trait::async_trait;
use sdk::errors::BoardError;
use sdk::types::Item;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::ItemBackend;

/// Backend storing the collection as a JSON file
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "board.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

fn unavailable(action: &str, path: &Path, err: impl std::fmt::Display) -> BoardError {
    BoardError::StorageUnavailable(format!("Failed to {} {}: {}", action, path.display(), err))
}

#[async_trait]
impl ItemBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn read(&self) -> Result<Vec<Item>, BoardError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(unavailable("read", &self.path, e)),
        };

        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&contents).map_err(|e| unavailable("decode", &self.path, e))
    }

    async fn write(&self, items: &[Item]) -> Result<(), BoardError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| unavailable("create directory for", &self.path, e))?;
        }

        let json = serde_json::to_string_pretty(items)?;
        let temp = self.temp_path();

        tokio::fs::write(&temp, json)
            .await
            .map_err(|e| unavailable("write", &temp, e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| unavailable("replace", &self.path, e))?;

        Ok(())
    }
}
