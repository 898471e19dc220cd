//! # Outbound Ports (Driven Ports / SPI)
//!
//! Persistence backends. The store prefixes every key it writes, so one
//! backend can host records next to unrelated settings.

use crate::domain::errors::StoreError;
use async_trait::async_trait;

/// A key-value space holding raw bytes.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Durable write of one key.
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// All keys starting with `prefix`.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// A key-value space that only accepts text values.
#[async_trait]
pub trait TextBackend: Send + Sync {
    async fn get_text(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn put_text(&self, key: &str, value: String) -> Result<(), StoreError>;

    async fn delete_text(&self, key: &str) -> Result<(), StoreError>;

    async fn text_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
impl<T: RecordBackend + ?Sized> RecordBackend for std::sync::Arc<T> {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get(key).await
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        (**self).put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        (**self).keys(prefix).await
    }
}

#[async_trait]
impl<T: TextBackend + ?Sized> TextBackend for std::sync::Arc<T> {
    async fn get_text(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get_text(key).await
    }

    async fn put_text(&self, key: &str, value: String) -> Result<(), StoreError> {
        (**self).put_text(key, value).await
    }

    async fn delete_text(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete_text(key).await
    }

    async fn text_keys(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        (**self).text_keys(prefix).await
    }
}
