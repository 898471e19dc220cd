//! # Session
//!
//! One owned value per connected client identity. Handlers receive it by
//! `&mut`; nothing about a session lives in shared globals.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Handshake phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    Disconnected,
    AwaitingInit1,
    AwaitingInit2,
    Steady,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Disconnected => "disconnected",
            Phase::AwaitingInit1 => "awaiting-init-1",
            Phase::AwaitingInit2 => "awaiting-init-2",
            Phase::Steady => "steady",
        };
        f.write_str(s)
    }
}

/// Per-connection session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Transport-facing identity; prefixes every topic.
    pub client_id: String,
    pub phase: Phase,
    /// `None` until the first steady-state round completes.
    pub expected_sequence: Option<u16>,
    /// First handshake message, replayed into every later engine call.
    pub handshake_msg_1: Option<Vec<u8>>,
    /// Second handshake message, replayed into every later engine call.
    pub handshake_msg_2: Option<Vec<u8>>,
    /// Steady-state response of the round awaiting a checkpoint.
    pub prev_response_a: Option<Vec<u8>>,
    /// Checkpoint bytes published for the round awaiting a checkpoint.
    pub prev_response_b: Option<Vec<u8>>,
    /// Steady-state rounds completed since the last reset.
    pub rounds: u64,
}

impl Session {
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            phase: Phase::Disconnected,
            expected_sequence: None,
            handshake_msg_1: None,
            handshake_msg_2: None,
            prev_response_a: None,
            prev_response_b: None,
            rounds: 0,
        }
    }

    /// Drop all handshake, checkpoint and sequencing context and enter `phase`.
    pub(crate) fn reset_to(&mut self, phase: Phase) {
        self.phase = phase;
        self.expected_sequence = None;
        self.handshake_msg_1 = None;
        self.handshake_msg_2 = None;
        self.prev_response_a = None;
        self.prev_response_b = None;
        self.rounds = 0;
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.phase != Phase::Disconnected
    }

    #[must_use]
    pub fn has_pending_checkpoint(&self) -> bool {
        self.prev_response_a.is_some() && self.prev_response_b.is_some()
    }
}
