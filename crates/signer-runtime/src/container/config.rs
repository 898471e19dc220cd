//! # Runtime Configuration
//!
//! Defaults, then `VS_*` environment overrides, then CLI flags.
//!
//! | Variable                | Field                          |
//! |-------------------------|--------------------------------|
//! | `VS_API_ROOT`           | `control.api_root`             |
//! | `VS_CONTROL_SECRET`     | `control.secret_hex`           |
//! | `VS_STATE_DIR`          | `storage.state_dir`            |
//! | `VS_CLIENT_ID`          | `session.client_id`            |
//! | `VS_NETWORK`            | `signer.network`               |
//! | `VS_RECONNECT_DELAY_MS` | `session.reconnect_delay_ms`   |

use shared_types::Network;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Name of the single state file inside `state_dir`.
pub const STATE_FILE: &str = "signer-state.json";

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Client id must not be empty or contain '/'")]
    InvalidClientId,

    #[error("Control API root must be an http(s) URL: {0}")]
    InvalidApiRoot(String),

    #[error("Control secret must be 64 hex characters")]
    InvalidControlSecret,

    #[error("Reconnect delay must be non-zero")]
    ZeroReconnectDelay,
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub session: SessionConfig,
    pub control: ControlConfig,
    pub storage: StorageConfig,
    pub signer: SignerConfig,
}

/// Pub/sub session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Broker address handed to the transport collaborator.
    pub broker_url: String,
    /// Identity that prefixes every topic.
    pub client_id: String,
    /// Pause after a disconnect before waiting for the next connection.
    pub reconnect_delay_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            broker_url: "localhost:1883".to_string(),
            client_id: "signer".to_string(),
            reconnect_delay_ms: 1_000,
        }
    }
}

/// Control channel configuration.
#[derive(Debug, Clone)]
pub struct ControlConfig {
    /// Root URL of the administrative endpoint.
    pub api_root: String,
    /// Hex secp256k1 secret. Generated and persisted when absent.
    pub secret_hex: Option<String>,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            api_root: "http://localhost:8000/api".to_string(),
            secret_hex: None,
            request_timeout_secs: 5,
            connect_timeout_secs: 2,
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding the state file.
    pub state_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("./signer-data"),
        }
    }
}

/// Signing engine configuration.
#[derive(Debug, Clone, Default)]
pub struct SignerConfig {
    /// Network used when the settings file does not name one.
    pub network: Network,
}

impl RuntimeConfig {
    /// Defaults with process environment overrides applied.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(root) = lookup("VS_API_ROOT") {
            self.control.api_root = root;
        }
        if let Some(secret) = lookup("VS_CONTROL_SECRET") {
            self.control.secret_hex = Some(secret);
        }
        if let Some(dir) = lookup("VS_STATE_DIR") {
            self.storage.state_dir = PathBuf::from(dir);
        }
        if let Some(id) = lookup("VS_CLIENT_ID") {
            self.session.client_id = id;
        }
        if let Some(network) = lookup("VS_NETWORK") {
            match network.parse() {
                Ok(n) => self.signer.network = n,
                Err(e) => warn!(value = %network, error = %e, "Ignoring VS_NETWORK"),
            }
        }
        if let Some(delay) = lookup("VS_RECONNECT_DELAY_MS") {
            match delay.parse() {
                Ok(ms) => self.session.reconnect_delay_ms = ms,
                Err(_) => warn!(value = %delay, "Ignoring VS_RECONNECT_DELAY_MS"),
            }
        }
    }

    /// Reject configurations the runtime cannot operate with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let id = &self.session.client_id;
        if id.is_empty() || id.contains('/') {
            return Err(ConfigError::InvalidClientId);
        }
        let root = &self.control.api_root;
        if !(root.starts_with("http://") || root.starts_with("https://")) {
            return Err(ConfigError::InvalidApiRoot(root.clone()));
        }
        if let Some(secret) = &self.control.secret_hex {
            let valid = secret.len() == 64 && secret.chars().all(|c| c.is_ascii_hexdigit());
            if !valid {
                return Err(ConfigError::InvalidControlSecret);
            }
        }
        if self.session.reconnect_delay_ms == 0 {
            return Err(ConfigError::ZeroReconnectDelay);
        }
        Ok(())
    }

    #[must_use]
    pub fn state_file(&self) -> PathBuf {
        self.storage.state_dir.join(STATE_FILE)
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.session.reconnect_delay_ms)
    }
}
