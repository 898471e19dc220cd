//! # Session Controller Service
//!
//! Implements `SessionControllerApi` over a transport, a signing engine, a
//! mutation store and an args provider.
//!
//! Within a round the order is fixed: engine call, sequence check, mutation
//! persistence, guard bookkeeping, publish. Nothing reaches the wire before
//! the mutations it depends on are durable.

use crate::domain::entities::{Checkpoint, EngineReturn, HandshakeContext, Outcome, RoundSummary};
use crate::domain::errors::SessionError;
use crate::ports::inbound::SessionControllerApi;
use crate::ports::outbound::{ArgsProvider, SigningEngine};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_bus::Transport;
use shared_types::{peek_vls_sequence, scoped_topic, topic_suffix, topics, Args, MessageKind, State};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use vs_01_mutation_store::{MutationBatch, MutationStoreApi, StoreError};
use vs_02_sequence_guard::{GuardError, SequenceGuardApi, SequenceGuardService, Session, Verdict};

/// Store clears attempted during violation recovery before giving up.
const CLEAR_ATTEMPTS: usize = 3;

/// Records persisted by a round, plus any velocity they carried.
#[derive(Debug, Default)]
struct Persisted {
    applied: usize,
    velocity: Option<Vec<u64>>,
}

/// Session Controller.
pub struct SessionController<T, E, S, A>
where
    T: Transport,
    E: SigningEngine,
    S: MutationStoreApi,
    A: ArgsProvider,
{
    transport: Arc<T>,
    engine: E,
    store: S,
    args: A,
    guard: SequenceGuardService,
    last_command: RwLock<Option<String>>,
    last_velocity: RwLock<Option<Vec<u64>>>,
}

impl<T, E, S, A> SessionController<T, E, S, A>
where
    T: Transport,
    E: SigningEngine,
    S: MutationStoreApi,
    A: ArgsProvider,
{
    #[must_use]
    pub fn new(transport: Arc<T>, engine: E, store: S, args: A) -> Self {
        Self {
            transport,
            engine,
            store,
            args,
            guard: SequenceGuardService::new(),
            last_command: RwLock::new(None),
            last_velocity: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn args_provider(&self) -> &A {
        &self.args
    }

    /// Command label of the most recent published round.
    #[must_use]
    pub fn last_command(&self) -> Option<String> {
        self.last_command.read().clone()
    }

    /// Most recent recent-payment velocity surfaced by a round.
    #[must_use]
    pub fn last_velocity(&self) -> Option<Vec<u64>> {
        self.last_velocity.read().clone()
    }

    async fn publish(&self, session: &Session, name: &str, payload: Vec<u8>) -> Result<String, SessionError> {
        let topic = scoped_topic(&session.client_id, topic_suffix(name));
        self.transport.publish(&topic, payload).await?;
        debug!(topic = %topic, "Published");
        Ok(topic)
    }

    /// Decode and persist the mutation batch in `bytes`, if any.
    async fn persist(&self, bytes: &[u8]) -> Result<Persisted, SessionError> {
        let batch = MutationBatch::decode(bytes)?;
        if batch.is_empty() {
            return Ok(Persisted::default());
        }
        let report = self.store.apply(&batch).await?;
        Ok(Persisted {
            applied: report.written.len(),
            velocity: batch.velocity(),
        })
    }

    async fn run_round(
        &self,
        session: &mut Session,
        kind: MessageKind,
        payload: &[u8],
    ) -> Result<RoundSummary, SessionError> {
        let args = self.args.make_args().await?;
        let state = self.store.snapshot().await?;
        let (ret, persisted, topic) = match kind {
            MessageKind::Init1 => self.init_1_round(session, &args, &state, payload).await?,
            MessageKind::Init2 => self.init_2_round(session, &args, &state, payload).await?,
            MessageKind::Vls => self.vls_round(session, &args, &state, payload).await?,
            MessageKind::Lss => self.lss_round(session, &args, &state, payload).await?,
        };

        // The round is already on the wire.
        if let Some(velocity) = &ret.velocity {
            if let Err(e) = self.args.observe_velocity(velocity).await {
                warn!(client = %session.client_id, error = %e, "Could not record velocity");
            }
        }
        let velocity = persisted
            .velocity
            .or_else(|| ret.velocity.as_ref().map(|v| v.payments().to_vec()));

        Ok(RoundSummary {
            kind,
            topic,
            sequence: (kind == MessageKind::Vls).then_some(ret.sequence),
            command: ret.cmd,
            applied: persisted.applied,
            velocity,
        })
    }

    async fn init_1_round(
        &self,
        session: &mut Session,
        args: &Args,
        state: &State,
        msg_1: &[u8],
    ) -> Result<(EngineReturn, Persisted, String), SessionError> {
        let ret = self.engine.run_init_1(args, state, msg_1).await?;
        let response = ret.outbound_bytes()?.to_vec();
        self.guard.capture_handshake(session, MessageKind::Init1, msg_1);
        let topic = self.publish(session, &ret.topic, response).await?;
        Ok((ret, Persisted::default(), topic))
    }

    async fn init_2_round(
        &self,
        session: &mut Session,
        args: &Args,
        state: &State,
        msg_2: &[u8],
    ) -> Result<(EngineReturn, Persisted, String), SessionError> {
        let ret = {
            let msg_1 = session
                .handshake_msg_1
                .as_deref()
                .ok_or(GuardError::HandshakeIncomplete)?;
            self.engine.run_init_2(args, state, msg_1, msg_2).await?
        };
        let response = ret.outbound_bytes()?.to_vec();
        let persisted = self.persist(&response).await?;
        self.guard.capture_handshake(session, MessageKind::Init2, msg_2);
        let topic = self.publish(session, &ret.topic, response).await?;
        Ok((ret, persisted, topic))
    }

    async fn vls_round(
        &self,
        session: &mut Session,
        args: &Args,
        state: &State,
        vls: &[u8],
    ) -> Result<(EngineReturn, Persisted, String), SessionError> {
        let ret = {
            let (msg_1, msg_2) = self.guard.handshake_context(session)?;
            let handshake = HandshakeContext { msg_1, msg_2 };
            self.engine
                .run_vls(args, state, handshake, vls, session.expected_sequence)
                .await?
        };
        self.guard.check_round(session, ret.sequence)?;

        let response = ret.outbound_bytes()?.to_vec();
        // Only a checkpoint round writes state; anything else is publish-only.
        let persisted = if ret.is_checkpoint() {
            let vls_bytes = ret.vls_bytes.clone().ok_or_else(|| SessionError::MissingPayload {
                topic: ret.topic.clone(),
            })?;
            let persisted = self.persist(&response).await?;
            self.guard.hold_checkpoint(session, vls_bytes, response.clone());
            persisted
        } else {
            Persisted::default()
        };
        self.guard.record_round(session, ret.sequence)?;

        let topic = self.publish(session, &ret.topic, response).await?;
        Ok((ret, persisted, topic))
    }

    async fn lss_round(
        &self,
        session: &mut Session,
        args: &Args,
        state: &State,
        lss: &[u8],
    ) -> Result<(EngineReturn, Persisted, String), SessionError> {
        let ret = {
            let (msg_1, msg_2) = self.guard.handshake_context(session)?;
            let (vls_bytes, lss_bytes) = self.guard.checkpoint_context(session)?;
            let handshake = HandshakeContext { msg_1, msg_2 };
            let previous = Checkpoint {
                vls_bytes,
                lss_bytes,
            };
            self.engine
                .run_lss(args, state, handshake, lss, previous)
                .await?
        };
        let response = ret.outbound_bytes()?.to_vec();
        self.guard.take_checkpoint(session)?;
        let topic = self.publish(session, &ret.topic, response).await?;
        Ok((ret, Persisted::default(), topic))
    }

    /// Clear the mutation store, retrying up to [`CLEAR_ATTEMPTS`] times.
    async fn clear_store(&self, session: &Session) -> Result<usize, StoreError> {
        let mut attempt = 1;
        loop {
            match self.store.clear().await {
                Ok(removed) => {
                    info!(client = %session.client_id, removed, attempt, "Mutation store cleared");
                    return Ok(removed);
                }
                Err(e) if attempt < CLEAR_ATTEMPTS => {
                    warn!(client = %session.client_id, error = %e, attempt, "Mutation store clear failed, retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Sequence-violation recovery: wipe local state and start over.
    ///
    /// `hello` is only announced once the store is empty, so the next
    /// handshake never sees state the violation invalidated.
    async fn recover(&self, session: &mut Session, cause: &SessionError) -> Outcome {
        error!(
            client = %session.client_id,
            phase = %session.phase,
            expected = ?session.expected_sequence,
            %cause,
            "SEQUENCE VIOLATION: clearing mutation store and restarting handshake"
        );
        let cleared = self.clear_store(session).await;
        self.guard.on_violation(session);
        if let Err(e) = cleared {
            let remaining = self.store.len().await.ok();
            error!(
                client = %session.client_id,
                error = %e,
                remaining = ?remaining,
                "Mutation store not cleared, withholding hello"
            );
            return Outcome::Failed(SessionError::Store(e));
        }
        if let Err(e) = self.publish(session, topics::HELLO, Vec::new()).await {
            error!(client = %session.client_id, error = %e, "Failed to re-announce");
        }
        Outcome::Reset {
            cause: cause.to_string(),
        }
    }
}

#[async_trait]
impl<T, E, S, A> SessionControllerApi for SessionController<T, E, S, A>
where
    T: Transport,
    E: SigningEngine,
    S: MutationStoreApi,
    A: ArgsProvider,
{
    async fn on_connect(&self, session: &mut Session) -> Result<(), SessionError> {
        self.guard.start(session);
        for name in topics::SIGNER_SUBSCRIPTIONS {
            let topic = scoped_topic(&session.client_id, name);
            self.transport.subscribe(&topic).await?;
        }
        self.publish(session, topics::HELLO, Vec::new()).await?;
        info!(client = %session.client_id, "Session connected");
        Ok(())
    }

    async fn on_disconnect(&self, session: &mut Session) {
        self.guard.on_disconnect(session);
        warn!(client = %session.client_id, "Session disconnected, context dropped");
    }

    async fn on_message(&self, session: &mut Session, topic: &str, payload: &[u8]) -> Outcome {
        let Some(kind) = MessageKind::from_topic(topic) else {
            warn!(client = %session.client_id, topic, "Unknown topic, message discarded");
            return Outcome::Discarded {
                topic: topic.to_string(),
            };
        };

        let incoming = match kind {
            MessageKind::Vls => peek_vls_sequence(payload),
            _ => None,
        };
        if let Verdict::Reject(reason) = self.guard.validate(session, kind, incoming) {
            return Outcome::Rejected(reason);
        }

        match self.run_round(session, kind, payload).await {
            Ok(summary) => {
                info!(
                    client = %session.client_id,
                    kind = %kind,
                    topic = %summary.topic,
                    sequence = ?summary.sequence,
                    command = %summary.command,
                    applied = summary.applied,
                    "Round complete"
                );
                *self.last_command.write() = Some(summary.command.clone());
                if let Some(velocity) = &summary.velocity {
                    *self.last_velocity.write() = Some(velocity.clone());
                }
                Outcome::Published(summary)
            }
            Err(e) if e.is_sequence_violation() => self.recover(session, &e).await,
            Err(SessionError::Engine(e)) => {
                error!(client = %session.client_id, kind = %kind, error = %e, "Signing engine failed, message dropped");
                Outcome::EngineFailed(e)
            }
            Err(e) => {
                error!(client = %session.client_id, kind = %kind, error = %e, "Round failed");
                Outcome::Failed(e)
            }
        }
    }

    async fn teardown(&self, session: &mut Session) -> Result<(), SessionError> {
        let announced = self.publish(session, topics::BYE, Vec::new()).await;
        self.guard.on_disconnect(session);
        info!(client = %session.client_id, "Session torn down");
        announced.map(|_| ())
    }
}
