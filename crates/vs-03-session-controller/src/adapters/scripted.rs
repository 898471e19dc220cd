//! Scripted signing engine for local runs and tests.
//!
//! Answers each call with the next queued result and records what it was
//! handed, so callers can assert on the exact context the controller built.

use crate::domain::entities::{Checkpoint, EngineReturn, HandshakeContext};
use crate::domain::errors::EngineError;
use crate::ports::outbound::SigningEngine;
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::{Args, MessageKind, State};
use std::collections::VecDeque;

/// One recorded engine invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedCall {
    pub kind: MessageKind,
    /// The inbound message bytes (`msg_1` for init-1, `msg_2` for init-2).
    pub payload: Vec<u8>,
    /// Snapshot handed to the engine.
    pub state: State,
    pub expected_sequence: Option<u16>,
    /// `(msg_1, msg_2)` replayed into steady-state calls.
    pub handshake: Option<(Vec<u8>, Vec<u8>)>,
    /// `(vls_bytes, lss_bytes)` replayed into checkpoint calls.
    pub previous: Option<(Vec<u8>, Vec<u8>)>,
}

/// Engine that plays back a queue of prepared results.
#[derive(Default)]
pub struct ScriptedEngine {
    script: Mutex<VecDeque<Result<EngineReturn, EngineError>>>,
    calls: Mutex<Vec<ScriptedCall>>,
}

impl ScriptedEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result for the next call.
    pub fn push(&self, result: Result<EngineReturn, EngineError>) {
        self.script.lock().push_back(result);
    }

    pub fn push_ok(&self, ret: EngineReturn) {
        self.push(Ok(ret));
    }

    pub fn push_err(&self, err: EngineError) {
        self.push(Err(err));
    }

    #[must_use]
    pub fn calls(&self) -> Vec<ScriptedCall> {
        self.calls.lock().clone()
    }

    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Results still queued.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }

    fn answer(&self, call: ScriptedCall) -> Result<EngineReturn, EngineError> {
        self.calls.lock().push(call);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(EngineError::Unavailable("script exhausted".to_string())))
    }
}

#[async_trait]
impl SigningEngine for ScriptedEngine {
    async fn run_init_1(
        &self,
        _args: &Args,
        state: &State,
        msg_1: &[u8],
    ) -> Result<EngineReturn, EngineError> {
        self.answer(ScriptedCall {
            kind: MessageKind::Init1,
            payload: msg_1.to_vec(),
            state: state.clone(),
            expected_sequence: None,
            handshake: None,
            previous: None,
        })
    }

    async fn run_init_2(
        &self,
        _args: &Args,
        state: &State,
        msg_1: &[u8],
        msg_2: &[u8],
    ) -> Result<EngineReturn, EngineError> {
        self.answer(ScriptedCall {
            kind: MessageKind::Init2,
            payload: msg_2.to_vec(),
            state: state.clone(),
            expected_sequence: None,
            handshake: Some((msg_1.to_vec(), msg_2.to_vec())),
            previous: None,
        })
    }

    async fn run_vls(
        &self,
        _args: &Args,
        state: &State,
        handshake: HandshakeContext<'_>,
        vls: &[u8],
        expected_sequence: Option<u16>,
    ) -> Result<EngineReturn, EngineError> {
        self.answer(ScriptedCall {
            kind: MessageKind::Vls,
            payload: vls.to_vec(),
            state: state.clone(),
            expected_sequence,
            handshake: Some((handshake.msg_1.to_vec(), handshake.msg_2.to_vec())),
            previous: None,
        })
    }

    async fn run_lss(
        &self,
        _args: &Args,
        state: &State,
        handshake: HandshakeContext<'_>,
        lss: &[u8],
        previous: Checkpoint<'_>,
    ) -> Result<EngineReturn, EngineError> {
        self.answer(ScriptedCall {
            kind: MessageKind::Lss,
            payload: lss.to_vec(),
            state: state.clone(),
            expected_sequence: None,
            handshake: Some((handshake.msg_1.to_vec(), handshake.msg_2.to_vec())),
            previous: Some((previous.vls_bytes.to_vec(), previous.lss_bytes.to_vec())),
        })
    }
}
