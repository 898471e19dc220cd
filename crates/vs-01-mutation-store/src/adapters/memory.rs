//! In-memory backends for tests and ephemeral sessions.

use crate::domain::errors::StoreError;
use crate::ports::outbound::{RecordBackend, TextBackend};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

/// In-memory byte backend.
///
/// Individual keys can be marked as failing to exercise partial-write
/// handling.
#[derive(Default)]
pub struct InMemoryRecordBackend {
    values: RwLock<BTreeMap<String, Vec<u8>>>,
    failing: RwLock<HashSet<String>>,
    refused_deletes: AtomicUsize,
}

impl InMemoryRecordBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` of `key` fail.
    pub fn fail_writes_to(&self, key: &str) {
        if let Ok(mut failing) = self.failing.write() {
            failing.insert(key.to_string());
        }
    }

    /// Make the next `count` deletes fail, whatever their key.
    pub fn refuse_deletes(&self, count: usize) {
        self.refused_deletes.store(count, Ordering::SeqCst);
    }

    /// Store raw bytes under `key`, bypassing the store codec.
    pub fn insert_raw(&self, key: &str, value: Vec<u8>) {
        if let Ok(mut values) = self.values.write() {
            values.insert(key.to_string(), value);
        }
    }

    #[must_use]
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.values.read().ok()?.get(key).cloned()
    }
}

#[async_trait]
impl RecordBackend for InMemoryRecordBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let values = self.values.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(values.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let failing = self.failing.read().map_err(|_| StoreError::LockPoisoned)?;
        if failing.contains(key) {
            return Err(StoreError::Backend(format!("write refused for {key}")));
        }
        drop(failing);

        let mut values = self.values.write().map_err(|_| StoreError::LockPoisoned)?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let refused = self
            .refused_deletes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(StoreError::Backend(format!("delete refused for {key}")));
        }

        let mut values = self.values.write().map_err(|_| StoreError::LockPoisoned)?;
        values.remove(key);
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let values = self.values.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(values
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}

/// In-memory text backend, the stand-in for browser-style local storage.
#[derive(Default)]
pub struct InMemoryTextBackend {
    values: RwLock<BTreeMap<String, String>>,
}

impl InMemoryTextBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TextBackend for InMemoryTextBackend {
    async fn get_text(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(values.get(key).cloned())
    }

    async fn put_text(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut values = self.values.write().map_err(|_| StoreError::LockPoisoned)?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete_text(&self, key: &str) -> Result<(), StoreError> {
        let mut values = self.values.write().map_err(|_| StoreError::LockPoisoned)?;
        values.remove(key);
        Ok(())
    }

    async fn text_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let values = self.values.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(values
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }
}
