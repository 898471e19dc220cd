//! # Handshake & Sequence Guard (VS-02)
//!
//! Tracks a session's handshake phase and the next steady-state sequence
//! number, and decides whether an inbound message may reach the signing
//! engine.
//!
//! ## State Machine
//!
//! ```text
//!                 connect / reconnect / violation
//!        ┌──────────────────────────────────────────────┐
//!        ▼                                              │
//! Disconnected ──start──→ AwaitingInit1 ──init-1──→ AwaitingInit2 ──init-2──→ Steady ─┐
//!                              ▲                                                │  ▲   │ vls / lss
//!                              └────────────── init-1 (restart) ────────────────┘  └───┘
//! ```
//!
//! ## Sequencing
//!
//! The engine is the source of truth: after each steady-state round the
//! expected sequence becomes `reported + 1`, where `reported` is what the
//! engine echoed back. Before the first round there is no expectation and
//! every steady-state message passes through.
//!
//! A message whose embedded sequence is behind the expectation is a
//! redelivered duplicate and is rejected here, which turns the transport's
//! at-least-once delivery into exactly-once processing.

#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod domain;
pub mod ports;
pub mod service;

pub use domain::errors::GuardError;
pub use domain::guard::{is_behind, RejectReason, Verdict};
pub use domain::session::{Phase, Session};
pub use ports::inbound::SequenceGuardApi;
pub use service::SequenceGuardService;
