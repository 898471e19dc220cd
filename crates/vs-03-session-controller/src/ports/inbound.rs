//! # Inbound Ports (Driving Ports / API)
//!
//! What the session run loop drives.

use crate::domain::entities::Outcome;
use crate::domain::errors::SessionError;
use async_trait::async_trait;
use vs_02_sequence_guard::Session;

/// Session Controller API.
///
/// Every call takes the session by `&mut`; callers handle one message at a
/// time per session, in arrival order.
#[async_trait]
pub trait SessionControllerApi: Send + Sync {
    /// Subscribe to the request topics, start the handshake and announce
    /// presence with `hello`.
    async fn on_connect(&self, session: &mut Session) -> Result<(), SessionError>;

    /// Transport dropped: forget all handshake and sequencing context.
    async fn on_disconnect(&self, session: &mut Session);

    /// Handle one inbound message to completion.
    async fn on_message(&self, session: &mut Session, topic: &str, payload: &[u8]) -> Outcome;

    /// Announce departure with `bye` and disconnect the session.
    async fn teardown(&self, session: &mut Session) -> Result<(), SessionError>;
}
