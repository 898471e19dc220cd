//! # Session Controller Entities
//!
//! What the signing engine returns and what the controller reports back
//! for each handled message.

use super::errors::{EngineError, SessionError};
use shared_types::{topic_suffix, topics, MessageKind, Velocity};
use vs_02_sequence_guard::RejectReason;

/// Result of one signing-engine call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EngineReturn {
    /// Unscoped outbound topic name (`vls-res`, `lss-res`, ...).
    pub topic: String,
    /// Steady-state response bytes.
    pub vls_bytes: Option<Vec<u8>>,
    /// State-sync bytes: handshake responses and mutation batches.
    pub lss_bytes: Option<Vec<u8>>,
    /// Sequence the engine processed (steady-state rounds only).
    pub sequence: u16,
    /// Command label for the round.
    pub cmd: String,
    /// Velocity the engine computed, when it changed.
    pub velocity: Option<Velocity>,
}

impl EngineReturn {
    /// A result whose payload travels in the steady-state slot.
    #[must_use]
    pub fn vls(topic: &str, bytes: Vec<u8>, sequence: u16, cmd: impl Into<String>) -> Self {
        Self {
            topic: topic.to_string(),
            vls_bytes: Some(bytes),
            sequence,
            cmd: cmd.into(),
            ..Self::default()
        }
    }

    /// A result whose payload travels in the state-sync slot.
    #[must_use]
    pub fn lss(topic: &str, bytes: Vec<u8>, cmd: impl Into<String>) -> Self {
        Self {
            topic: topic.to_string(),
            lss_bytes: Some(bytes),
            cmd: cmd.into(),
            ..Self::default()
        }
    }

    /// A checkpoint round: the steady-state bytes are held back while the
    /// state-sync bytes are published on `lss-res`.
    #[must_use]
    pub fn checkpoint(vls_bytes: Vec<u8>, lss_bytes: Vec<u8>, sequence: u16, cmd: impl Into<String>) -> Self {
        Self {
            topic: topics::LSS_RES.to_string(),
            vls_bytes: Some(vls_bytes),
            lss_bytes: Some(lss_bytes),
            sequence,
            cmd: cmd.into(),
            velocity: None,
        }
    }

    #[must_use]
    pub fn with_velocity(mut self, velocity: Velocity) -> Self {
        self.velocity = Some(velocity);
        self
    }

    /// Whether this steady-state result asks for a checkpoint round.
    #[must_use]
    pub fn is_checkpoint(&self) -> bool {
        topic_suffix(&self.topic) == topics::LSS_RES
    }

    /// The bytes to publish on [`Self::topic`].
    ///
    /// `vls-res` carries the steady-state bytes; every other topic carries
    /// the state-sync bytes.
    ///
    /// # Errors
    /// * `SessionError::MissingPayload` - the relevant slot is empty
    pub fn outbound_bytes(&self) -> Result<&[u8], SessionError> {
        let slot = if topic_suffix(&self.topic) == topics::VLS_RES {
            &self.vls_bytes
        } else {
            &self.lss_bytes
        };
        slot.as_deref().ok_or_else(|| SessionError::MissingPayload {
            topic: self.topic.clone(),
        })
    }
}

/// Both handshake messages, replayed into every steady-state call.
#[derive(Debug, Clone, Copy)]
pub struct HandshakeContext<'a> {
    pub msg_1: &'a [u8],
    pub msg_2: &'a [u8],
}

/// Bytes held from the round that requested a checkpoint.
#[derive(Debug, Clone, Copy)]
pub struct Checkpoint<'a> {
    pub vls_bytes: &'a [u8],
    pub lss_bytes: &'a [u8],
}

/// Summary of a round that reached the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundSummary {
    pub kind: MessageKind,
    /// Scoped topic the response went out on.
    pub topic: String,
    /// Sequence the engine reported, for steady-state rounds.
    pub sequence: Option<u16>,
    pub command: String,
    /// Mutation records persisted before publishing.
    pub applied: usize,
    /// Recent-payment velocity surfaced by this round.
    pub velocity: Option<Vec<u64>>,
}

/// What happened to one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The round completed and its response was published.
    Published(RoundSummary),
    /// Unrecognized topic; nothing changed.
    Discarded { topic: String },
    /// The guard refused the message before it reached the engine.
    Rejected(RejectReason),
    /// The engine failed; nothing was applied or published.
    EngineFailed(EngineError),
    /// A sequence violation wiped local state and restarted the handshake.
    Reset { cause: String },
    /// Args, storage or transport failure.
    Failed(SessionError),
}

impl Outcome {
    #[must_use]
    pub fn is_published(&self) -> bool {
        matches!(self, Outcome::Published(_))
    }

    #[must_use]
    pub fn summary(&self) -> Option<&RoundSummary> {
        match self {
            Outcome::Published(summary) => Some(summary),
            _ => None,
        }
    }
}
