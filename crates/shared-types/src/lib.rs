//! # Shared Types Crate
//!
//! Types that cross crate boundaries in the signer session layer.
//!
//! ## Contents
//!
//! - **Topics**: the pub/sub topic names and the closed set of request kinds
//!   the session layer reacts to.
//! - **Entities**: the argument bundle handed to the signing engine on every
//!   call (seed, network, policy, velocity, allowlist, freshness nonce).
//! - **Wire**: small helpers for peeking into engine payloads.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: topic names are defined once, here.
//! - **Closed dispatch**: request kinds are an enum, so an unhandled kind is
//!   a compile error in every `match`.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod entities;
pub mod errors;
pub mod topics;
pub mod wire;

pub use entities::*;
pub use errors::*;
pub use topics::{scoped_topic, topic_suffix, MessageKind};
pub use wire::peek_vls_sequence;
