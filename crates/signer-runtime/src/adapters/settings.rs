//! # Persisted Settings
//!
//! Scalar signer settings kept next to the mutation records in the same
//! text backend, under their own `settings/` prefix:
//!
//! | Key                       | Value                        |
//! |---------------------------|------------------------------|
//! | `settings/seed`           | 32-byte hex, generated once  |
//! | `settings/lss_nonce`      | 32-byte hex, generated once  |
//! | `settings/control_secret` | 32-byte hex, generated once  |
//! | `settings/nonce`          | decimal control nonce        |
//! | `settings/network`        | network name                 |
//! | `settings/policy`         | JSON `Policy`                |
//! | `settings/allowlist`      | JSON array of strings        |
//! | `settings/velocity`       | JSON `[start, [payments]]`   |
//!
//! Implements the engine's `ArgsProvider` and the control channel's
//! `NonceStore`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use shared_types::{Args, Network, Policy, Velocity};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use vs_01_mutation_store::{StoreError, TextBackend};
use vs_03_session_controller::{ArgsProvider, SessionError};
use vs_04_control_channel::{ControlError, NonceStore, Secp256k1Envelope};
use zeroize::Zeroizing;

const SEED_KEY: &str = "settings/seed";
const LSS_NONCE_KEY: &str = "settings/lss_nonce";
const CONTROL_SECRET_KEY: &str = "settings/control_secret";
const NONCE_KEY: &str = "settings/nonce";
const NETWORK_KEY: &str = "settings/network";
const POLICY_KEY: &str = "settings/policy";
const ALLOWLIST_KEY: &str = "settings/allowlist";
const VELOCITY_KEY: &str = "settings/velocity";

/// Errors reading or writing settings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Settings store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Signer settings over a text backend.
pub struct SettingsStore<T: TextBackend> {
    backend: T,
    default_network: Network,
    /// Serializes generate-once secrets.
    init: Mutex<()>,
}

impl<T: TextBackend> SettingsStore<T> {
    #[must_use]
    pub fn new(backend: T, default_network: Network) -> Self {
        Self {
            backend,
            default_network,
            init: Mutex::new(()),
        }
    }

    async fn load_json<V: DeserializeOwned>(&self, key: &'static str) -> Result<Option<V>, SettingsError> {
        match self.backend.get_text(key).await? {
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| SettingsError::Invalid {
                    key,
                    reason: e.to_string(),
                }),
            None => Ok(None),
        }
    }

    async fn store_json<V: Serialize>(&self, key: &'static str, value: &V) -> Result<(), SettingsError> {
        let text = serde_json::to_string(value).map_err(|e| SettingsError::Invalid {
            key,
            reason: e.to_string(),
        })?;
        self.backend.put_text(key, text).await?;
        Ok(())
    }

    /// Load a 32-byte secret, generating and persisting it on first use.
    async fn key32(
        &self,
        key: &'static str,
        generate: impl FnOnce() -> Zeroizing<String> + Send,
    ) -> Result<Zeroizing<[u8; 32]>, SettingsError> {
        let _guard = self.init.lock().await;
        let text = match self.backend.get_text(key).await? {
            Some(text) => Zeroizing::new(text),
            None => {
                let fresh = generate();
                self.backend.put_text(key, fresh.to_string()).await?;
                info!(key, "Generated new secret");
                fresh
            }
        };
        Args::parse_key32(key, &text)
            .map(Zeroizing::new)
            .map_err(|e| SettingsError::Invalid {
                key,
                reason: e.to_string(),
            })
    }

    fn random_hex() -> Zeroizing<String> {
        let bytes = Zeroizing::new(rand::random::<[u8; 32]>());
        Zeroizing::new(hex::encode(*bytes))
    }

    pub async fn seed(&self) -> Result<Zeroizing<[u8; 32]>, SettingsError> {
        self.key32(SEED_KEY, Self::random_hex).await
    }

    /// Freshness nonce for state-server authentication.
    pub async fn lss_nonce(&self) -> Result<[u8; 32], SettingsError> {
        Ok(*self.key32(LSS_NONCE_KEY, Self::random_hex).await?)
    }

    /// Hex control-channel secret; always a valid secp256k1 scalar.
    pub async fn control_secret(&self) -> Result<Zeroizing<String>, SettingsError> {
        let key = self
            .key32(CONTROL_SECRET_KEY, || Secp256k1Envelope::random().secret_hex())
            .await?;
        Ok(Zeroizing::new(hex::encode(*key)))
    }

    pub async fn network(&self) -> Result<Network, SettingsError> {
        match self.backend.get_text(NETWORK_KEY).await? {
            Some(name) => name.parse().map_err(|e: shared_types::TypeError| SettingsError::Invalid {
                key: NETWORK_KEY,
                reason: e.to_string(),
            }),
            None => Ok(self.default_network),
        }
    }

    pub async fn set_network(&self, network: Network) -> Result<(), SettingsError> {
        self.backend
            .put_text(NETWORK_KEY, network.as_str().to_string())
            .await?;
        Ok(())
    }

    pub async fn policy(&self) -> Result<Policy, SettingsError> {
        Ok(self.load_json(POLICY_KEY).await?.unwrap_or_default())
    }

    pub async fn set_policy(&self, policy: &Policy) -> Result<(), SettingsError> {
        self.store_json(POLICY_KEY, policy).await
    }

    pub async fn allowlist(&self) -> Result<Vec<String>, SettingsError> {
        Ok(self.load_json(ALLOWLIST_KEY).await?.unwrap_or_default())
    }

    pub async fn set_allowlist(&self, allowlist: &[String]) -> Result<(), SettingsError> {
        self.store_json(ALLOWLIST_KEY, &allowlist).await
    }

    pub async fn velocity(&self) -> Result<Option<Velocity>, SettingsError> {
        self.load_json(VELOCITY_KEY).await
    }

    pub async fn set_velocity(&self, velocity: &Velocity) -> Result<(), SettingsError> {
        self.store_json(VELOCITY_KEY, velocity).await
    }

    /// Last control nonce consumed.
    pub async fn nonce(&self) -> Result<u64, SettingsError> {
        match self.backend.get_text(NONCE_KEY).await? {
            Some(text) => text.trim().parse().map_err(|_| SettingsError::Invalid {
                key: NONCE_KEY,
                reason: format!("not a number: {text}"),
            }),
            None => Ok(0),
        }
    }

    pub async fn set_nonce(&self, nonce: u64) -> Result<(), SettingsError> {
        self.backend.put_text(NONCE_KEY, nonce.to_string()).await?;
        Ok(())
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[async_trait]
impl<T: TextBackend> ArgsProvider for SettingsStore<T> {
    async fn make_args(&self) -> Result<Args, SessionError> {
        let args = async {
            Ok::<_, SettingsError>(Args {
                seed: *self.seed().await?,
                network: self.network().await?,
                policy: self.policy().await?,
                velocity: self.velocity().await?,
                allowlist: self.allowlist().await?,
                timestamp: now_secs(),
                lss_nonce: self.lss_nonce().await?,
            })
        }
        .await
        .map_err(|e| SessionError::Args(e.to_string()))?;
        debug!(network = %args.network, allowlist = args.allowlist.len(), "Args assembled");
        Ok(args)
    }

    async fn observe_velocity(&self, velocity: &Velocity) -> Result<(), SessionError> {
        self.set_velocity(velocity)
            .await
            .map_err(|e| SessionError::Args(e.to_string()))
    }
}

#[async_trait]
impl<T: TextBackend> NonceStore for SettingsStore<T> {
    async fn load_nonce(&self) -> Result<u64, ControlError> {
        self.nonce()
            .await
            .map_err(|e| ControlError::Nonce(e.to_string()))
    }

    async fn store_nonce(&self, nonce: u64) -> Result<(), ControlError> {
        self.set_nonce(nonce)
            .await
            .map_err(|e| ControlError::Nonce(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::Interval;
    use std::sync::Arc;
    use vs_01_mutation_store::{FileTextBackend, InMemoryTextBackend};

    fn settings() -> SettingsStore<InMemoryTextBackend> {
        SettingsStore::new(InMemoryTextBackend::new(), Network::Regtest)
    }

    #[tokio::test]
    async fn test_seed_generated_once() {
        let settings = settings();
        let first = settings.seed().await.unwrap();
        let second = settings.seed().await.unwrap();
        assert_eq!(*first, *second);
        assert_ne!(*first, [0u8; 32]);
        assert_ne!(settings.lss_nonce().await.unwrap(), *first);
    }

    #[tokio::test]
    async fn test_defaults_when_unset() {
        let settings = settings();
        assert_eq!(settings.network().await.unwrap(), Network::Regtest);
        assert_eq!(settings.policy().await.unwrap(), Policy::default());
        assert!(settings.allowlist().await.unwrap().is_empty());
        assert_eq!(settings.velocity().await.unwrap(), None);
        assert_eq!(settings.nonce().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_args_reflect_settings() {
        let settings = settings();
        let policy = Policy {
            msat_per_interval: 10,
            interval: Interval::Hourly,
            htlc_limit_msat: 5,
        };
        settings.set_policy(&policy).await.unwrap();
        settings.set_network(Network::Testnet).await.unwrap();
        settings
            .set_allowlist(&["02aa@1.2.3.4".to_string()])
            .await
            .unwrap();
        settings
            .observe_velocity(&Velocity(7, vec![1, 2]))
            .await
            .unwrap();

        let args = settings.make_args().await.unwrap();
        assert_eq!(args.policy, policy);
        assert_eq!(args.network, Network::Testnet);
        assert_eq!(args.allowlist, vec!["02aa@1.2.3.4".to_string()]);
        assert_eq!(args.velocity, Some(Velocity(7, vec![1, 2])));
        assert_eq!(args.seed, *settings.seed().await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_seed_is_error() {
        let backend = Arc::new(InMemoryTextBackend::new());
        backend
            .put_text(SEED_KEY, "nothex".to_string())
            .await
            .unwrap();
        let settings = SettingsStore::new(Arc::clone(&backend), Network::Regtest);
        assert!(matches!(
            settings.make_args().await,
            Err(SessionError::Args(_))
        ));
    }

    #[tokio::test]
    async fn test_nonce_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        {
            let settings = SettingsStore::new(FileTextBackend::open(&path).await.unwrap(), Network::Regtest);
            settings.store_nonce(17).await.unwrap();
        }
        let settings = SettingsStore::new(FileTextBackend::open(&path).await.unwrap(), Network::Regtest);
        assert_eq!(settings.load_nonce().await.unwrap(), 17);
    }

    #[tokio::test]
    async fn test_control_secret_is_usable() {
        let settings = settings();
        let secret = settings.control_secret().await.unwrap();
        let again = settings.control_secret().await.unwrap();
        assert_eq!(*secret, *again);
        assert!(Secp256k1Envelope::from_secret_hex(&secret).is_ok());
    }
}
