//! # Session Controller (VS-03)
//!
//! Owns the transport-facing side of a signer session. Every inbound
//! `(topic, payload)` item is classified by its topic suffix, checked by the
//! sequence guard, dispatched to the signing engine together with the
//! current args and state snapshot, and its result persisted and published.
//!
//! ## Round Handling
//!
//! ```text
//! topic ──→ MessageKind ──→ guard.validate ──→ args + snapshot ──→ engine
//!                                                                    │
//!        guard.record_round ←── publish ←── store.apply ←────────────┘
//! ```
//!
//! | Kind  | Engine call  | Persisted before publish      | Published on       |
//! |-------|--------------|-------------------------------|--------------------|
//! | init-1| `run_init_1` | nothing                       | `init-1-res`       |
//! | init-2| `run_init_2` | `Created` mutations           | `init-2-res`       |
//! | vls   | `run_vls`    | `VlsMuts` mutations, if any   | `vls-res`/`lss-res`|
//! | lss   | `run_lss`    | nothing (applied by the vls)  | `vls-res`          |
//!
//! ## Sequence Violation
//!
//! A violation, whether reported by the engine or detected when recording
//! the round, clears the mutation store, resets the session to
//! `AwaitingInit1` and re-announces with `hello`.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{FixedArgsProvider, ScriptedCall, ScriptedEngine};
pub use domain::entities::{Checkpoint, EngineReturn, HandshakeContext, Outcome, RoundSummary};
pub use domain::errors::{EngineError, SessionError};
pub use ports::inbound::SessionControllerApi;
pub use ports::outbound::{ArgsProvider, SigningEngine};
pub use service::SessionController;
