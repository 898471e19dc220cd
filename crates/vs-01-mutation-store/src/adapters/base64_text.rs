//! Byte backend layered over a text-only backend.

use crate::domain::errors::{CodecError, StoreError};
use crate::ports::outbound::{RecordBackend, TextBackend};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Stores each byte value as standard base64 text.
pub struct Base64Backend<T: TextBackend> {
    inner: T,
}

impl<T: TextBackend> Base64Backend<T> {
    #[must_use]
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    #[must_use]
    pub fn inner(&self) -> &T {
        &self.inner
    }
}

#[async_trait]
impl<T: TextBackend> RecordBackend for Base64Backend<T> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let Some(text) = self.inner.get_text(key).await? else {
            return Ok(None);
        };
        BASE64
            .decode(text.trim())
            .map(Some)
            .map_err(|e| StoreError::Corrupt {
                name: key.to_string(),
                reason: CodecError::Base64(e.to_string()),
            })
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.inner.put_text(key, BASE64.encode(value)).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete_text(key).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        self.inner.text_keys(prefix).await
    }
}
