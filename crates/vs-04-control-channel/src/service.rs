//! # Control Service
//!
//! Implements `ControlApi`: serialize, allocate a nonce, seal, post, open,
//! decode. Any failure short-circuits; the nonce stays consumed.

use crate::domain::commands::{ControlCommand, ControlResponse};
use crate::domain::errors::ControlError;
use crate::nonce::NonceCounter;
use crate::ports::inbound::ControlApi;
use crate::ports::outbound::{ControlTransport, EnvelopeSigner, NonceStore};
use async_trait::async_trait;
use tracing::{debug, info, warn};

/// Control Channel.
pub struct ControlService<S, T, N>
where
    S: EnvelopeSigner,
    T: ControlTransport,
    N: NonceStore,
{
    signer: S,
    transport: T,
    nonces: NonceCounter<N>,
}

impl<S, T, N> ControlService<S, T, N>
where
    S: EnvelopeSigner,
    T: ControlTransport,
    N: NonceStore,
{
    #[must_use]
    pub fn new(signer: S, transport: T, nonce_store: N) -> Self {
        Self {
            signer,
            transport,
            nonces: NonceCounter::new(nonce_store),
        }
    }

    #[must_use]
    pub fn nonces(&self) -> &NonceCounter<N> {
        &self.nonces
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

#[async_trait]
impl<S, T, N> ControlApi for ControlService<S, T, N>
where
    S: EnvelopeSigner,
    T: ControlTransport,
    N: NonceStore,
{
    async fn send(&self, command: ControlCommand) -> Result<ControlResponse, ControlError> {
        let payload = command
            .to_payload()
            .map_err(|e| ControlError::Serialization(e.to_string()))?;
        let nonce = self.nonces.next().await?;
        let envelope = self.signer.seal(&payload, nonce)?;
        debug!(command = command.name(), nonce, "Sending control command");

        let body = self.transport.post(&envelope).await.map_err(|e| {
            warn!(command = command.name(), nonce, error = %e, "Control command failed, nonce burned");
            e
        })?;
        let plaintext = self.signer.open_response(&body)?;
        let response: ControlResponse =
            serde_json::from_slice(&plaintext).map_err(|e| ControlError::Parse(e.to_string()))?;

        match response {
            ControlResponse::Error(message) => {
                warn!(command = command.name(), nonce, %message, "Signer refused control command");
                Err(ControlError::Remote(message))
            }
            response if response.answers(&command) => {
                info!(command = command.name(), nonce, "Control command acknowledged");
                Ok(response)
            }
            other => Err(ControlError::UnexpectedResponse {
                command: command.name(),
                got: other.name().to_string(),
            }),
        }
    }

    async fn fast_forward(&self, remote: u64) -> Result<u64, ControlError> {
        self.nonces.fast_forward(remote).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{encode_response, InMemoryNonceStore, LoopbackSigner, Secp256k1Envelope};
    use shared_types::{Interval, Policy, Velocity};
    use std::sync::Arc;

    type Service = ControlService<Secp256k1Envelope, Arc<LoopbackSigner>, InMemoryNonceStore>;

    fn service() -> (Service, Arc<LoopbackSigner>) {
        let signer = Secp256k1Envelope::random();
        let device = Arc::new(LoopbackSigner::new(signer.verifying_key()));
        let service = ControlService::new(signer, Arc::clone(&device), InMemoryNonceStore::new());
        (service, device)
    }

    /// Answers every request with the same body.
    struct FixedReply(String);

    #[async_trait]
    impl ControlTransport for FixedReply {
        async fn post(&self, _envelope: &str) -> Result<String, ControlError> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_policy_round_trip() {
        let (service, _) = service();
        let policy = Policy {
            msat_per_interval: 5_000,
            interval: Interval::Hourly,
            htlc_limit_msat: 1_000,
        };
        assert_eq!(service.update_policy(policy.clone()).await.unwrap(), policy);
        assert_eq!(service.query_policy().await.unwrap(), policy);
        assert_eq!(service.nonces().current().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_allowlist_and_query_all() {
        let signer = Secp256k1Envelope::random();
        let device = Arc::new(
            LoopbackSigner::new(signer.verifying_key()).with_velocity(Velocity(10, vec![1])),
        );
        let service = ControlService::new(signer, Arc::clone(&device), InMemoryNonceStore::new());

        let list = vec!["02abc@host".to_string()];
        assert_eq!(service.update_allowlist(list.clone()).await.unwrap(), list);
        assert_eq!(service.query_allowlist().await.unwrap(), list);
        assert_eq!(
            service.query_velocity().await.unwrap(),
            Some(Velocity(10, vec![1]))
        );
        let all = service.query_all().await.unwrap();
        assert_eq!(all.allowlist, list);
        assert_eq!(all.velocity, Some(Velocity(10, vec![1])));
        service.reset_all().await.unwrap();
        assert!(service.query_allowlist().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_send_burns_nonce() {
        let (service, device) = service();
        device.set_offline(true);
        assert!(matches!(
            service.query_policy().await,
            Err(ControlError::Transport(_))
        ));
        device.set_offline(false);

        service.query_policy().await.unwrap();
        assert_eq!(device.nonces(), vec![2]);
    }

    #[tokio::test]
    async fn test_query_nonce_fast_forwards() {
        let (service, device) = service();
        service.reset_wifi().await.unwrap();
        service.reset_keys().await.unwrap();
        assert_eq!(service.query_nonce().await.unwrap(), 2);
        assert_eq!(device.nonces(), vec![1, 2]);

        // a controller that lost its local counter catches up
        let other = ControlService::new(
            Secp256k1Envelope::random(),
            FixedReply(encode_response(&ControlResponse::Nonce(40)).unwrap()),
            InMemoryNonceStore::new(),
        );
        assert_eq!(other.query_nonce().await.unwrap(), 40);
        assert_eq!(other.nonces().current().await.unwrap(), 40);
        assert_eq!(other.nonces().next().await.unwrap(), 41);
    }

    #[tokio::test]
    async fn test_remote_error_surfaces() {
        let service = ControlService::new(
            Secp256k1Envelope::random(),
            FixedReply(encode_response(&ControlResponse::Error("busy".into())).unwrap()),
            InMemoryNonceStore::new(),
        );
        assert_eq!(
            service.query_policy().await,
            Err(ControlError::Remote("busy".to_string()))
        );
    }

    #[tokio::test]
    async fn test_wrong_response_kind() {
        let service = ControlService::new(
            Secp256k1Envelope::random(),
            FixedReply(encode_response(&ControlResponse::ResetWifi).unwrap()),
            InMemoryNonceStore::new(),
        );
        assert_eq!(
            service.reset_keys().await,
            Err(ControlError::UnexpectedResponse {
                command: "ResetKeys",
                got: "ResetWifi".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_unparseable_response() {
        let service = ControlService::new(
            Secp256k1Envelope::random(),
            FixedReply("not hex".to_string()),
            InMemoryNonceStore::new(),
        );
        assert!(matches!(
            service.query_all().await,
            Err(ControlError::Parse(_))
        ));
        assert_eq!(service.nonces().current().await.unwrap(), 1);
    }
}
