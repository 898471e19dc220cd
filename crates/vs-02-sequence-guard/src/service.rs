//! # Sequence Guard Service
//!
//! Implements `SequenceGuardApi`: the pure rules from `domain::guard` plus
//! the state transitions they imply, with tracing.

use crate::domain::errors::GuardError;
use crate::domain::guard::{self, is_behind, Verdict};
use crate::domain::session::{Phase, Session};
use crate::ports::inbound::SequenceGuardApi;
use shared_types::MessageKind;
use tracing::{debug, warn};

/// Stateless guard; all state lives in the [`Session`] it is handed.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequenceGuardService;

impl SequenceGuardService {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl SequenceGuardApi for SequenceGuardService {
    fn start(&self, session: &mut Session) {
        session.reset_to(Phase::AwaitingInit1);
        debug!(client = %session.client_id, "Session started");
    }

    fn validate(&self, session: &Session, kind: MessageKind, incoming: Option<u16>) -> Verdict {
        let verdict = guard::validate(session, kind, incoming);
        if let Verdict::Reject(reason) = &verdict {
            warn!(
                client = %session.client_id,
                kind = %kind,
                phase = %session.phase,
                %reason,
                "Message rejected"
            );
        }
        verdict
    }

    fn capture_handshake(&self, session: &mut Session, kind: MessageKind, bytes: &[u8]) {
        match kind {
            MessageKind::Init1 => {
                if session.phase != Phase::AwaitingInit1 {
                    debug!(client = %session.client_id, phase = %session.phase, "Handshake restarted");
                }
                session.reset_to(Phase::AwaitingInit2);
                session.handshake_msg_1 = Some(bytes.to_vec());
            }
            MessageKind::Init2 => {
                session.handshake_msg_2 = Some(bytes.to_vec());
                session.phase = Phase::Steady;
                debug!(client = %session.client_id, "Handshake complete");
            }
            MessageKind::Vls | MessageKind::Lss => {}
        }
    }

    fn handshake_context<'a>(
        &self,
        session: &'a Session,
    ) -> Result<(&'a [u8], &'a [u8]), GuardError> {
        match (&session.handshake_msg_1, &session.handshake_msg_2) {
            (Some(m1), Some(m2)) if session.phase == Phase::Steady => {
                Ok((m1.as_slice(), m2.as_slice()))
            }
            _ => Err(GuardError::HandshakeIncomplete),
        }
    }

    fn check_round(&self, session: &Session, reported: u16) -> Result<(), GuardError> {
        match session.expected_sequence {
            Some(expected) if is_behind(reported, expected) => {
                Err(GuardError::SequenceViolation { expected, reported })
            }
            _ => Ok(()),
        }
    }

    fn record_round(&self, session: &mut Session, reported: u16) -> Result<(), GuardError> {
        self.check_round(session, reported)?;
        session.expected_sequence = Some(reported.wrapping_add(1));
        session.rounds += 1;
        debug!(
            client = %session.client_id,
            reported,
            next = reported.wrapping_add(1),
            "Round recorded"
        );
        Ok(())
    }

    fn hold_checkpoint(&self, session: &mut Session, vls_bytes: Vec<u8>, lss_bytes: Vec<u8>) {
        session.prev_response_a = Some(vls_bytes);
        session.prev_response_b = Some(lss_bytes);
    }

    fn checkpoint_context<'a>(
        &self,
        session: &'a Session,
    ) -> Result<(&'a [u8], &'a [u8]), GuardError> {
        match (&session.prev_response_a, &session.prev_response_b) {
            (Some(a), Some(b)) => Ok((a.as_slice(), b.as_slice())),
            _ => Err(GuardError::NoPendingCheckpoint),
        }
    }

    fn take_checkpoint(&self, session: &mut Session) -> Result<(Vec<u8>, Vec<u8>), GuardError> {
        match (session.prev_response_a.take(), session.prev_response_b.take()) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(GuardError::NoPendingCheckpoint),
        }
    }

    fn on_disconnect(&self, session: &mut Session) {
        session.reset_to(Phase::Disconnected);
        debug!(client = %session.client_id, "Session disconnected");
    }

    fn on_violation(&self, session: &mut Session) {
        session.reset_to(Phase::AwaitingInit1);
    }
}
