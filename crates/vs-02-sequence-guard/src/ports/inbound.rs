//! # Inbound Ports (Driving Ports / API)
//!
//! Operations the session controller drives on a [`Session`].

use crate::domain::errors::GuardError;
use crate::domain::guard::Verdict;
use crate::domain::session::Session;
use shared_types::MessageKind;

/// Handshake & Sequence Guard API.
pub trait SequenceGuardApi: Send + Sync {
    /// Begin a session on a fresh connection (`AwaitingInit1`, no expectation).
    fn start(&self, session: &mut Session);

    /// Validate an inbound message before it reaches the engine.
    fn validate(&self, session: &Session, kind: MessageKind, incoming: Option<u16>) -> Verdict;

    /// Capture a handshake message after the engine accepted it.
    ///
    /// `Init1` restarts the handshake; `Init2` completes it.
    fn capture_handshake(&self, session: &mut Session, kind: MessageKind, bytes: &[u8]);

    /// Both handshake messages, for replay into steady-state calls.
    ///
    /// # Errors
    /// * `GuardError::HandshakeIncomplete` - called before `Steady`
    fn handshake_context<'a>(
        &self,
        session: &'a Session,
    ) -> Result<(&'a [u8], &'a [u8]), GuardError>;

    /// Check a reported sequence against the expectation without recording it.
    ///
    /// # Errors
    /// * `GuardError::SequenceViolation` - `reported` is behind the expectation
    fn check_round(&self, session: &Session, reported: u16) -> Result<(), GuardError>;

    /// Advance the expectation to `reported + 1`.
    ///
    /// # Errors
    /// * `GuardError::SequenceViolation` - `reported` is behind the expectation
    fn record_round(&self, session: &mut Session, reported: u16) -> Result<(), GuardError>;

    /// Store the responses of a round that awaits a checkpoint follow-up.
    fn hold_checkpoint(&self, session: &mut Session, vls_bytes: Vec<u8>, lss_bytes: Vec<u8>);

    /// The held checkpoint context, for replay into the follow-up call.
    ///
    /// # Errors
    /// * `GuardError::NoPendingCheckpoint` - nothing held
    fn checkpoint_context<'a>(
        &self,
        session: &'a Session,
    ) -> Result<(&'a [u8], &'a [u8]), GuardError>;

    /// Take the held checkpoint context, leaving none behind.
    ///
    /// # Errors
    /// * `GuardError::NoPendingCheckpoint` - nothing held
    fn take_checkpoint(&self, session: &mut Session) -> Result<(Vec<u8>, Vec<u8>), GuardError>;

    /// Transport dropped: `Disconnected`, all context discarded.
    fn on_disconnect(&self, session: &mut Session);

    /// Engine reported a sequence violation: back to `AwaitingInit1`.
    fn on_violation(&self, session: &mut Session);
}
