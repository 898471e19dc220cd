//! # Control Channel (VS-04)
//!
//! Authenticated request/response channel for administrative commands,
//! separate from the session transport.
//!
//! ## Request Path
//!
//! ```text
//! ControlCommand ──JSON──→ payload ──NonceCounter──→ (payload, nonce)
//!        │                                                 │
//!        │                                   seal (secp256k1, hex)
//!        ▼                                                 ▼
//! ControlResponse ←──JSON── hex body ←── POST <api-root>/control?msg=<envelope>
//! ```
//!
//! ## Nonce Discipline
//!
//! The nonce is allocated and persisted before the request leaves, under a
//! lock that admits one allocation at a time. A failed request burns its
//! nonce; nothing ever reuses one.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod nonce;
pub mod ports;
pub mod service;

pub use adapters::{
    encode_response, lightning_hash, HttpControlTransport, InMemoryNonceStore, LoopbackSigner,
    Secp256k1Envelope,
};
pub use domain::commands::{All, ControlCommand, ControlResponse, OtaParams};
pub use domain::errors::ControlError;
pub use nonce::NonceCounter;
pub use ports::inbound::ControlApi;
pub use ports::outbound::{ControlTransport, EnvelopeSigner, NonceStore};
pub use service::ControlService;
