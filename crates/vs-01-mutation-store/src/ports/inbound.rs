//! # Inbound Ports (Driving Ports / API)
//!
//! The store API the session controller drives.

use crate::domain::entities::{ApplyReport, MutationBatch};
use crate::domain::errors::StoreError;
use async_trait::async_trait;
use shared_types::State;

/// Versioned Mutation Store API.
#[async_trait]
pub trait MutationStoreApi: Send + Sync {
    /// Rebuild the full `name -> (version, payload)` view.
    ///
    /// An empty store yields an empty map.
    ///
    /// # Errors
    /// * `StoreError::Corrupt` - a persisted record failed to decode
    async fn snapshot(&self) -> Result<State, StoreError>;

    /// Overwrite each named record with the given version and payload.
    ///
    /// Every name is attempted even if an earlier one fails.
    ///
    /// # Errors
    /// * `StoreError::PartialApply` - some names failed; the rest were written
    async fn apply(&self, batch: &MutationBatch) -> Result<ApplyReport, StoreError>;

    /// Decode the engine's envelope and apply it.
    async fn apply_encoded(&self, bytes: &[u8]) -> Result<ApplyReport, StoreError> {
        let batch = MutationBatch::decode(bytes)?;
        self.apply(&batch).await
    }

    /// Erase every record. Returns how many were removed.
    async fn clear(&self) -> Result<usize, StoreError>;

    /// Number of persisted records.
    async fn len(&self) -> Result<usize, StoreError>;
}

#[async_trait]
impl<T: MutationStoreApi + ?Sized> MutationStoreApi for std::sync::Arc<T> {
    async fn snapshot(&self) -> Result<State, StoreError> {
        (**self).snapshot().await
    }

    async fn apply(&self, batch: &MutationBatch) -> Result<ApplyReport, StoreError> {
        (**self).apply(batch).await
    }

    async fn clear(&self) -> Result<usize, StoreError> {
        (**self).clear().await
    }

    async fn len(&self) -> Result<usize, StoreError> {
        (**self).len().await
    }
}
