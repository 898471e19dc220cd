//! # Session Runner
//!
//! Drives one session from the transport's single event intake.
//!
//! ```text
//! next_event() ──→ Connected ─────→ on_connect (subscribe, hello)
//!              ──→ Message ───────→ on_message (one at a time, arrival order)
//!              ──→ Disconnected ──→ on_disconnect, pause, keep waiting
//!              ──→ None ──────────→ teardown (bye), return
//! shutdown ────────────────────────→ teardown (bye), return
//! ```
//!
//! A shutdown request is only observed between events, so a message that
//! is being handled always runs to completion.

use std::sync::Arc;
use std::time::Duration;

use shared_bus::{Transport, TransportEvent};
use tokio::sync::watch;
use tracing::{error, info, warn};
use vs_02_sequence_guard::Session;
use vs_03_session_controller::{Outcome, SessionControllerApi};

/// Tally of what the runner saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerStats {
    pub connects: u64,
    pub disconnects: u64,
    pub messages: u64,
    pub published: u64,
    pub rejected: u64,
    pub discarded: u64,
    pub resets: u64,
    pub engine_failures: u64,
    pub failures: u64,
}

impl RunnerStats {
    fn record(&mut self, outcome: &Outcome) {
        self.messages += 1;
        match outcome {
            Outcome::Published(_) => self.published += 1,
            Outcome::Discarded { .. } => self.discarded += 1,
            Outcome::Rejected(_) => self.rejected += 1,
            Outcome::EngineFailed(_) => self.engine_failures += 1,
            Outcome::Reset { .. } => self.resets += 1,
            Outcome::Failed(_) => self.failures += 1,
        }
    }
}

/// Why [`SessionRunner::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The transport closed its event intake.
    TransportClosed,
    /// Shutdown was requested.
    Shutdown,
}

/// Run loop for one session.
pub struct SessionRunner<T, C>
where
    T: Transport,
    C: SessionControllerApi,
{
    transport: Arc<T>,
    controller: C,
    session: Session,
    reconnect_delay: Duration,
    shutdown: watch::Receiver<bool>,
    stats: RunnerStats,
}

impl<T, C> SessionRunner<T, C>
where
    T: Transport,
    C: SessionControllerApi,
{
    /// `transport` must be the endpoint `controller` publishes on.
    #[must_use]
    pub fn new(
        transport: Arc<T>,
        controller: C,
        client_id: &str,
        reconnect_delay: Duration,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            transport,
            controller,
            session: Session::new(client_id),
            reconnect_delay,
            shutdown,
            stats: RunnerStats::default(),
        }
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub fn controller(&self) -> &C {
        &self.controller
    }

    #[must_use]
    pub fn stats(&self) -> RunnerStats {
        self.stats
    }

    /// Resolves once shutdown is requested or the sender is gone.
    async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                return;
            }
            if shutdown.changed().await.is_err() {
                return;
            }
        }
    }

    /// Process events until the transport closes or shutdown is requested.
    pub async fn run(&mut self) -> StopReason {
        info!(client = %self.session.client_id, "Session runner started");

        let reason = loop {
            let event = tokio::select! {
                biased;
                _ = Self::shutdown_requested(&mut self.shutdown) => break StopReason::Shutdown,
                event = self.transport.next_event() => event,
            };

            match event {
                Some(TransportEvent::Connected) => {
                    self.stats.connects += 1;
                    if let Err(e) = self.controller.on_connect(&mut self.session).await {
                        self.stats.failures += 1;
                        error!(client = %self.session.client_id, error = %e, "Connect handling failed");
                    }
                }
                Some(TransportEvent::Message(message)) => {
                    let outcome = self
                        .controller
                        .on_message(&mut self.session, &message.topic, &message.payload)
                        .await;
                    self.stats.record(&outcome);
                }
                Some(TransportEvent::Disconnected { reason }) => {
                    self.stats.disconnects += 1;
                    warn!(client = %self.session.client_id, reason = %reason, "Transport disconnected");
                    self.controller.on_disconnect(&mut self.session).await;
                    tokio::select! {
                        biased;
                        _ = Self::shutdown_requested(&mut self.shutdown) => break StopReason::Shutdown,
                        _ = tokio::time::sleep(self.reconnect_delay) => {}
                    }
                }
                None => break StopReason::TransportClosed,
            }
        };

        if let Err(e) = self.controller.teardown(&mut self.session).await {
            warn!(client = %self.session.client_id, error = %e, "Could not announce shutdown");
        }
        info!(
            client = %self.session.client_id,
            reason = ?reason,
            messages = self.stats.messages,
            published = self.stats.published,
            resets = self.stats.resets,
            "Session runner stopped"
        );
        reason
    }
}
