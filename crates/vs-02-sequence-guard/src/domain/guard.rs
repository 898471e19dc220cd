//! # Validation Rules
//!
//! Pure functions deciding whether an inbound message may reach the engine.
//!
//! | Phase          | init-1  | init-2  | vls                | lss                   |
//! |----------------|---------|---------|--------------------|-----------------------|
//! | Disconnected   | reject  | reject  | reject             | reject                |
//! | AwaitingInit1  | accept  | reject  | reject             | reject                |
//! | AwaitingInit2  | restart | accept  | reject             | reject                |
//! | Steady         | restart | reject  | accept unless stale| accept if checkpoint  |

use super::session::{Phase, Session};
use shared_types::MessageKind;
use std::fmt;

/// Outcome of validating one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject(RejectReason),
}

impl Verdict {
    #[must_use]
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

/// Why a message was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// No live connection.
    NotConnected,
    /// A handshake message arrived out of order.
    HandshakeOutOfOrder { phase: Phase, kind: MessageKind },
    /// A steady-state message arrived before the handshake completed.
    HandshakeIncomplete { phase: Phase },
    /// The message is behind the expected sequence (redelivery).
    StaleSequence { expected: u16, incoming: u16 },
    /// A checkpoint follow-up arrived with no steady-state round awaiting it.
    NoPendingCheckpoint,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::NotConnected => write!(f, "not connected"),
            RejectReason::HandshakeOutOfOrder { phase, kind } => {
                write!(f, "{kind} out of order in phase {phase}")
            }
            RejectReason::HandshakeIncomplete { phase } => {
                write!(f, "handshake incomplete (phase {phase})")
            }
            RejectReason::StaleSequence { expected, incoming } => {
                write!(f, "stale sequence {incoming}, expected {expected}")
            }
            RejectReason::NoPendingCheckpoint => write!(f, "no pending checkpoint"),
        }
    }
}

/// Whether `candidate` lies strictly behind `expected` in wrapping `u16`
/// sequence space.
///
/// The window is half the range: a candidate 1 to 32767 steps below
/// `expected` is behind, while one 32768 or more steps below counts as
/// ahead, so the counter survives wrapping from `u16::MAX` to 0.
#[must_use]
pub fn is_behind(candidate: u16, expected: u16) -> bool {
    let distance = expected.wrapping_sub(candidate);
    distance != 0 && distance <= u16::MAX / 2
}

/// Validate an inbound message against the session.
///
/// `incoming` is the sequence embedded in the message, when it carries one.
#[must_use]
pub fn validate(session: &Session, kind: MessageKind, incoming: Option<u16>) -> Verdict {
    match (session.phase, kind) {
        (Phase::Disconnected, _) => Verdict::Reject(RejectReason::NotConnected),

        (_, MessageKind::Init1) => Verdict::Accept,

        (Phase::AwaitingInit2, MessageKind::Init2) => Verdict::Accept,
        (phase, MessageKind::Init2) => {
            Verdict::Reject(RejectReason::HandshakeOutOfOrder { phase, kind })
        }

        (phase, MessageKind::Vls | MessageKind::Lss) if phase != Phase::Steady => {
            Verdict::Reject(RejectReason::HandshakeIncomplete { phase })
        }

        (_, MessageKind::Vls) => match (session.expected_sequence, incoming) {
            (Some(expected), Some(incoming)) if is_behind(incoming, expected) => {
                Verdict::Reject(RejectReason::StaleSequence { expected, incoming })
            }
            _ => Verdict::Accept,
        },

        (_, MessageKind::Lss) => {
            if session.has_pending_checkpoint() {
                Verdict::Accept
            } else {
                Verdict::Reject(RejectReason::NoPendingCheckpoint)
            }
        }
    }
}
