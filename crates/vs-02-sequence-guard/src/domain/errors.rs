//! # Guard Errors

use thiserror::Error;

/// Errors raised by the guard.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GuardError {
    /// The engine reported a round that is behind the expected sequence.
    #[error("Sequence violation: expected {expected}, engine reported {reported}")]
    SequenceViolation { expected: u16, reported: u16 },

    /// Steady-state context requested before both handshake messages were captured.
    #[error("Handshake incomplete")]
    HandshakeIncomplete,

    /// Checkpoint follow-up requested with no stored steady-state response.
    #[error("No pending checkpoint")]
    NoPendingCheckpoint,
}
