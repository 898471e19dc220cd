//! Args provider over fixed configuration values.

use crate::domain::errors::SessionError;
use crate::ports::outbound::ArgsProvider;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Args, FreshnessNonce, Network, Policy, Seed, Velocity};
use std::time::{SystemTime, UNIX_EPOCH};
use zeroize::Zeroizing;

/// Serves the same configuration on every call, stamped with the current
/// time. Velocity follows whatever the engine last surfaced.
pub struct FixedArgsProvider {
    seed: Zeroizing<Seed>,
    network: Network,
    policy: Policy,
    allowlist: Vec<String>,
    lss_nonce: FreshnessNonce,
    velocity: RwLock<Option<Velocity>>,
}

impl FixedArgsProvider {
    #[must_use]
    pub fn new(seed: Seed, network: Network, lss_nonce: FreshnessNonce) -> Self {
        Self {
            seed: Zeroizing::new(seed),
            network,
            policy: Policy::default(),
            allowlist: Vec::new(),
            lss_nonce,
            velocity: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_allowlist(mut self, allowlist: Vec<String>) -> Self {
        self.allowlist = allowlist;
        self
    }

    #[must_use]
    pub fn velocity(&self) -> Option<Velocity> {
        self.velocity.read().clone()
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[async_trait]
impl ArgsProvider for FixedArgsProvider {
    async fn make_args(&self) -> Result<Args, SessionError> {
        Ok(Args {
            seed: *self.seed,
            network: self.network,
            policy: self.policy.clone(),
            velocity: self.velocity.read().clone(),
            allowlist: self.allowlist.clone(),
            timestamp: now_secs(),
            lss_nonce: self.lss_nonce,
        })
    }

    async fn observe_velocity(&self, velocity: &Velocity) -> Result<(), SessionError> {
        *self.velocity.write() = Some(velocity.clone());
        Ok(())
    }
}
