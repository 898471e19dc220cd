//! # Control Nonce Allocation
//!
//! Every command consumes the next nonce exactly once, and the new value is
//! durable before the command leaves the process. Allocation is serialized
//! behind an async mutex held across load, increment and persist.

use crate::domain::errors::ControlError;
use crate::ports::outbound::NonceStore;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Serialized allocator over a [`NonceStore`].
pub struct NonceCounter<N: NonceStore> {
    store: N,
    lock: Mutex<()>,
}

impl<N: NonceStore> NonceCounter<N> {
    #[must_use]
    pub fn new(store: N) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn store(&self) -> &N {
        &self.store
    }

    /// Consume the next nonce.
    ///
    /// The persisted counter is never rolled back, even if the caller's
    /// request later fails.
    pub async fn next(&self) -> Result<u64, ControlError> {
        let _guard = self.lock.lock().await;
        let current = self.store.load_nonce().await?;
        let next = current
            .checked_add(1)
            .ok_or_else(|| ControlError::Nonce("nonce space exhausted".to_string()))?;
        self.store.store_nonce(next).await?;
        debug!(nonce = next, "Nonce allocated");
        Ok(next)
    }

    /// Last nonce consumed.
    pub async fn current(&self) -> Result<u64, ControlError> {
        let _guard = self.lock.lock().await;
        self.store.load_nonce().await
    }

    /// Raise the counter to `remote` if the signer has seen a higher value.
    /// Never lowers it.
    pub async fn fast_forward(&self, remote: u64) -> Result<u64, ControlError> {
        let _guard = self.lock.lock().await;
        let current = self.store.load_nonce().await?;
        if remote <= current {
            return Ok(current);
        }
        self.store.store_nonce(remote).await?;
        info!(from = current, to = remote, "Control nonce fast-forwarded");
        Ok(remote)
    }
}
