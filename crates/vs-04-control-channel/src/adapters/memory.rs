//! In-process adapters: a volatile nonce store and a loopback signer that
//! answers control envelopes the way the remote device does.

use super::envelope::{encode_response, Secp256k1Envelope};
use crate::domain::commands::{All, ControlCommand, ControlResponse};
use crate::domain::errors::ControlError;
use crate::ports::outbound::{ControlTransport, NonceStore};
use async_trait::async_trait;
use k256::ecdsa::VerifyingKey;
use parking_lot::Mutex;
use shared_types::{Policy, Velocity};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};

/// Nonce store kept in memory.
#[derive(Default)]
pub struct InMemoryNonceStore {
    nonce: Mutex<u64>,
    fail_writes: AtomicBool,
}

impl InMemoryNonceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_nonce(nonce: u64) -> Self {
        Self {
            nonce: Mutex::new(nonce),
            fail_writes: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn nonce(&self) -> u64 {
        *self.nonce.lock()
    }

    /// Make every subsequent write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl NonceStore for InMemoryNonceStore {
    async fn load_nonce(&self) -> Result<u64, ControlError> {
        Ok(*self.nonce.lock())
    }

    async fn store_nonce(&self, nonce: u64) -> Result<(), ControlError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ControlError::Nonce("write refused".to_string()));
        }
        *self.nonce.lock() = nonce;
        Ok(())
    }
}

#[derive(Default)]
struct DeviceState {
    policy: Policy,
    allowlist: Vec<String>,
    velocity: Option<Velocity>,
    seen: BTreeSet<u64>,
    offline: bool,
}

/// Loopback endpoint that verifies envelopes and answers like the signer.
///
/// Any nonce already seen is refused with an `Error` response.
pub struct LoopbackSigner {
    controller: VerifyingKey,
    state: Mutex<DeviceState>,
}

impl LoopbackSigner {
    #[must_use]
    pub fn new(controller: VerifyingKey) -> Self {
        Self {
            controller,
            state: Mutex::new(DeviceState::default()),
        }
    }

    #[must_use]
    pub fn with_velocity(self, velocity: Velocity) -> Self {
        self.state.lock().velocity = Some(velocity);
        self
    }

    /// Every nonce accepted so far, ascending.
    #[must_use]
    pub fn nonces(&self) -> Vec<u64> {
        self.state.lock().seen.iter().copied().collect()
    }

    /// Drop every request at the transport level while `offline`.
    pub fn set_offline(&self, offline: bool) {
        self.state.lock().offline = offline;
    }

    fn handle(&self, command: ControlCommand, nonce: u64) -> ControlResponse {
        let mut state = self.state.lock();
        let highest = state.seen.last().copied().unwrap_or(0);
        if command == ControlCommand::Nonce {
            return ControlResponse::Nonce(highest);
        }
        if !state.seen.insert(nonce) {
            return ControlResponse::Error(format!("nonce {nonce} reused"));
        }

        match command {
            ControlCommand::Nonce => ControlResponse::Nonce(highest),
            ControlCommand::ResetWifi => ControlResponse::ResetWifi,
            ControlCommand::ResetKeys => ControlResponse::ResetKeys,
            ControlCommand::ResetAll => {
                state.policy = Policy::default();
                state.allowlist.clear();
                ControlResponse::ResetAll
            }
            ControlCommand::QueryPolicy => ControlResponse::PolicyCurrent(state.policy.clone()),
            ControlCommand::UpdatePolicy(policy) => {
                state.policy = policy;
                ControlResponse::PolicyUpdated(state.policy.clone())
            }
            ControlCommand::QueryAllowlist => {
                ControlResponse::AllowlistCurrent(state.allowlist.clone())
            }
            ControlCommand::UpdateAllowlist(list) => {
                state.allowlist = list;
                ControlResponse::AllowlistUpdated(state.allowlist.clone())
            }
            ControlCommand::QueryVelocity => ControlResponse::VelocityCurrent(state.velocity.clone()),
            ControlCommand::Ota(params) => ControlResponse::OtaConfirm(params),
            ControlCommand::QueryAll => ControlResponse::AllCurrent(All {
                policy: state.policy.clone(),
                allowlist: state.allowlist.clone(),
                velocity: state.velocity.clone(),
            }),
        }
    }
}

#[async_trait]
impl ControlTransport for LoopbackSigner {
    async fn post(&self, envelope: &str) -> Result<String, ControlError> {
        if self.state.lock().offline {
            return Err(ControlError::Transport("loopback offline".to_string()));
        }
        let response = match Secp256k1Envelope::open_request(envelope, &self.controller) {
            Ok((payload, nonce)) => match serde_json::from_slice::<ControlCommand>(&payload) {
                Ok(command) => self.handle(command, nonce),
                Err(e) => ControlResponse::Error(format!("bad command: {e}")),
            },
            Err(e) => ControlResponse::Error(e.to_string()),
        };
        encode_response(&response)
    }
}
