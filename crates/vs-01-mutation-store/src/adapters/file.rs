//! File-backed text store.
//!
//! All keys live in one JSON object on disk. Every write rewrites the file
//! through a temporary sibling and a rename, so a crash leaves either the
//! old or the new contents.

use crate::domain::errors::StoreError;
use crate::ports::outbound::TextBackend;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

/// JSON-file text backend.
pub struct FileTextBackend {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileTextBackend {
    /// Open (or create on first write) the store at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let values = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                StoreError::Backend(format!("unreadable store {}: {e}", path.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(StoreError::Backend(e.to_string())),
        };
        debug!(path = %path.display(), keys = values.len(), "Opened file store");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let bytes =
            serde_json::to_vec_pretty(values).map_err(|e| StoreError::Backend(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StoreError::Backend(e.to_string()))?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }
}

#[async_trait]
impl TextBackend for FileTextBackend {
    async fn get_text(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn put_text(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut values = self.values.lock().await;
        let previous = values.insert(key.to_string(), value);
        if let Err(e) = self.persist(&values).await {
            // keep memory in line with disk
            match previous {
                Some(old) => values.insert(key.to_string(), old),
                None => values.remove(key),
            };
            return Err(e);
        }
        Ok(())
    }

    async fn delete_text(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().await;
        let Some(previous) = values.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.persist(&values).await {
            values.insert(key.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    async fn text_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .values
            .lock()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
