//! # Outbound Ports (Driven Ports / SPI)
//!
//! The signing engine and the args source the controller depends on.

use crate::domain::entities::{Checkpoint, EngineReturn, HandshakeContext};
use crate::domain::errors::{EngineError, SessionError};
use async_trait::async_trait;
use shared_types::{Args, State, Velocity};
use std::sync::Arc;

/// The external validating-signer engine.
///
/// The engine is stateless between calls: everything it needs arrives as
/// arguments, and every state change comes back as a mutation batch.
#[async_trait]
pub trait SigningEngine: Send + Sync {
    /// First handshake step. The response travels in `lss_bytes`.
    async fn run_init_1(
        &self,
        args: &Args,
        state: &State,
        msg_1: &[u8],
    ) -> Result<EngineReturn, EngineError>;

    /// Second handshake step. `lss_bytes` carries a `Created` mutation batch
    /// that doubles as the published response.
    async fn run_init_2(
        &self,
        args: &Args,
        state: &State,
        msg_1: &[u8],
        msg_2: &[u8],
    ) -> Result<EngineReturn, EngineError>;

    /// Steady-state round.
    ///
    /// `expected_sequence` is `None` until the first round completes.
    async fn run_vls(
        &self,
        args: &Args,
        state: &State,
        handshake: HandshakeContext<'_>,
        vls: &[u8],
        expected_sequence: Option<u16>,
    ) -> Result<EngineReturn, EngineError>;

    /// Checkpoint follow-up, replaying the round that requested it.
    async fn run_lss(
        &self,
        args: &Args,
        state: &State,
        handshake: HandshakeContext<'_>,
        lss: &[u8],
        previous: Checkpoint<'_>,
    ) -> Result<EngineReturn, EngineError>;
}

/// Source of the per-call engine arguments.
#[async_trait]
pub trait ArgsProvider: Send + Sync {
    /// Assemble fresh args for one engine call.
    async fn make_args(&self) -> Result<Args, SessionError>;

    /// Called when a round surfaces a new velocity, so later args carry it.
    async fn observe_velocity(&self, _velocity: &Velocity) -> Result<(), SessionError> {
        Ok(())
    }
}

#[async_trait]
impl<T: SigningEngine + ?Sized> SigningEngine for Arc<T> {
    async fn run_init_1(
        &self,
        args: &Args,
        state: &State,
        msg_1: &[u8],
    ) -> Result<EngineReturn, EngineError> {
        (**self).run_init_1(args, state, msg_1).await
    }

    async fn run_init_2(
        &self,
        args: &Args,
        state: &State,
        msg_1: &[u8],
        msg_2: &[u8],
    ) -> Result<EngineReturn, EngineError> {
        (**self).run_init_2(args, state, msg_1, msg_2).await
    }

    async fn run_vls(
        &self,
        args: &Args,
        state: &State,
        handshake: HandshakeContext<'_>,
        vls: &[u8],
        expected_sequence: Option<u16>,
    ) -> Result<EngineReturn, EngineError> {
        (**self)
            .run_vls(args, state, handshake, vls, expected_sequence)
            .await
    }

    async fn run_lss(
        &self,
        args: &Args,
        state: &State,
        handshake: HandshakeContext<'_>,
        lss: &[u8],
        previous: Checkpoint<'_>,
    ) -> Result<EngineReturn, EngineError> {
        (**self)
            .run_lss(args, state, handshake, lss, previous)
            .await
    }
}

#[async_trait]
impl<T: ArgsProvider + ?Sized> ArgsProvider for Arc<T> {
    async fn make_args(&self) -> Result<Args, SessionError> {
        (**self).make_args().await
    }

    async fn observe_velocity(&self, velocity: &Velocity) -> Result<(), SessionError> {
        (**self).observe_velocity(velocity).await
    }
}
