//! # Mutation Store Service
//!
//! Implements `MutationStoreApi` over any `RecordBackend`.
//!
//! The service owns the key layout (`muts/<name>`) and the record codec;
//! backends only see opaque keys and byte strings.

use crate::domain::codec::{decode_record, encode_record};
use crate::domain::entities::{ApplyReport, MutationBatch};
use crate::domain::errors::StoreError;
use crate::ports::inbound::MutationStoreApi;
use crate::ports::outbound::RecordBackend;
use async_trait::async_trait;
use shared_types::State;
use tracing::{debug, error, info};

/// Key prefix for every mutation record.
pub const RECORD_PREFIX: &str = "muts/";

/// Versioned Mutation Store.
pub struct MutationStoreService<B: RecordBackend> {
    backend: B,
}

impl<B: RecordBackend> MutationStoreService<B> {
    #[must_use]
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn key(name: &str) -> String {
        format!("{RECORD_PREFIX}{name}")
    }

    fn name(key: &str) -> &str {
        key.strip_prefix(RECORD_PREFIX).unwrap_or(key)
    }
}

#[async_trait]
impl<B: RecordBackend> MutationStoreApi for MutationStoreService<B> {
    async fn snapshot(&self) -> Result<State, StoreError> {
        let mut state = State::new();
        for key in self.backend.keys(RECORD_PREFIX).await? {
            let Some(bytes) = self.backend.get(&key).await? else {
                continue;
            };
            let name = Self::name(&key);
            let (version, payload) = decode_record(&bytes).map_err(|reason| {
                error!(record = name, %reason, "Corrupt mutation record");
                StoreError::Corrupt {
                    name: name.to_string(),
                    reason,
                }
            })?;
            state.insert(name.to_string(), (version, payload));
        }
        debug!(records = state.len(), "Snapshot built");
        Ok(state)
    }

    async fn apply(&self, batch: &MutationBatch) -> Result<ApplyReport, StoreError> {
        let mut report = ApplyReport::default();
        for record in &batch.records {
            let bytes = encode_record(record.version, &record.payload);
            match self.backend.put(&Self::key(&record.name), bytes).await {
                Ok(()) => report.written.push(record.name.clone()),
                Err(e) => {
                    error!(record = %record.name, version = record.version, error = %e, "Mutation write failed");
                    report.failed.push(record.name.clone());
                }
            }
        }

        if !report.is_complete() {
            return Err(StoreError::PartialApply {
                written: report.written.len(),
                failed: report.failed,
            });
        }
        debug!(records = report.written.len(), "Mutations applied");
        Ok(report)
    }

    async fn clear(&self) -> Result<usize, StoreError> {
        let keys = self.backend.keys(RECORD_PREFIX).await?;
        for key in &keys {
            self.backend.delete(key).await?;
        }
        info!(records = keys.len(), "Mutation store cleared");
        Ok(keys.len())
    }

    async fn len(&self) -> Result<usize, StoreError> {
        Ok(self.backend.keys(RECORD_PREFIX).await?.len())
    }
}
