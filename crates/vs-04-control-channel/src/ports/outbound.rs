//! # Outbound Ports (Driven Ports / SPI)

use crate::domain::errors::ControlError;
use async_trait::async_trait;
use std::sync::Arc;

/// Durable home of the control nonce.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Last nonce consumed; `0` if none ever was.
    async fn load_nonce(&self) -> Result<u64, ControlError>;

    /// Persist the last nonce consumed.
    async fn store_nonce(&self, nonce: u64) -> Result<(), ControlError>;
}

/// Seals outbound commands and opens inbound responses.
pub trait EnvelopeSigner: Send + Sync {
    /// Bind `payload` to `nonce` and sign it. Returns the hex envelope.
    fn seal(&self, payload: &[u8], nonce: u64) -> Result<String, ControlError>;

    /// Recover the plaintext response from the endpoint's body.
    fn open_response(&self, body: &str) -> Result<Vec<u8>, ControlError>;
}

/// Request/response carrier to the administrative endpoint.
#[async_trait]
pub trait ControlTransport: Send + Sync {
    /// Deliver a sealed envelope and return the raw response body.
    async fn post(&self, envelope: &str) -> Result<String, ControlError>;
}

#[async_trait]
impl<T: NonceStore + ?Sized> NonceStore for Arc<T> {
    async fn load_nonce(&self) -> Result<u64, ControlError> {
        (**self).load_nonce().await
    }

    async fn store_nonce(&self, nonce: u64) -> Result<(), ControlError> {
        (**self).store_nonce(nonce).await
    }
}

#[async_trait]
impl<T: ControlTransport + ?Sized> ControlTransport for Arc<T> {
    async fn post(&self, envelope: &str) -> Result<String, ControlError> {
        (**self).post(envelope).await
    }
}
