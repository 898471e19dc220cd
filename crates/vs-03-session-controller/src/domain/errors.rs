//! # Session Errors

use shared_bus::TransportError;
use thiserror::Error;
use vs_01_mutation_store::StoreError;
use vs_02_sequence_guard::GuardError;

/// Prefix the engine uses when a steady-state message is out of order.
const SEQUENCE_VIOLATION_PREFIX: &str = "invalid sequence";

/// Failures reported by the signing engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// The incoming sequence does not match the engine's expectation.
    #[error("Sequence violation: {0}")]
    SequenceViolation(String),

    /// The engine refused the input (malformed message, policy failure).
    #[error("Engine rejected message: {0}")]
    Rejected(String),

    /// The engine could not be reached or crashed.
    #[error("Engine unavailable: {0}")]
    Unavailable(String),
}

impl EngineError {
    /// Classify an engine failure message.
    #[must_use]
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.starts_with(SEQUENCE_VIOLATION_PREFIX) {
            EngineError::SequenceViolation(message)
        } else {
            EngineError::Rejected(message)
        }
    }

    #[must_use]
    pub fn is_sequence_violation(&self) -> bool {
        matches!(self, EngineError::SequenceViolation(_))
    }
}

/// Errors from session controller operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Engine arguments could not be assembled.
    #[error("Args unavailable: {0}")]
    Args(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Guard error: {0}")]
    Guard(#[from] GuardError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// The engine result carried no bytes for the topic it named.
    #[error("Engine returned no payload for {topic}")]
    MissingPayload { topic: String },
}

impl SessionError {
    #[must_use]
    pub fn is_sequence_violation(&self) -> bool {
        match self {
            SessionError::Engine(e) => e.is_sequence_violation(),
            SessionError::Guard(GuardError::SequenceViolation { .. }) => true,
            _ => false,
        }
    }
}
