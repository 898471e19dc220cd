//! # Shared Bus - Pub/Sub Transport Plumbing
//!
//! The session layer talks to its remote counterpart over a topic-based
//! publish/subscribe transport. This crate defines the narrow port the
//! session layer needs and an in-memory broker that implements it.
//!
//! ## Message Passing
//!
//! ```text
//! ┌──────────────┐   publish()    ┌──────────────┐   TransportEvent   ┌──────────────┐
//! │  Counterpart │ ─────────────→ │    Broker    │ ─────────────────→ │ Session Loop │
//! │              │ ←───────────── │              │ ←───────────────── │              │
//! └──────────────┘   deliver      └──────────────┘     publish()      └──────────────┘
//! ```
//!
//! The transport delivers `(topic, payload)` items through a single intake
//! (`next_event`). There are no callbacks, so per-session ordering is
//! whatever order the intake yields.
//!
//! ## Delivery
//!
//! - At-least-once: the broker may deliver a message more than once.
//! - Subscriptions are dropped on disconnect and must be renewed.

#![allow(clippy::missing_const_for_fn)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

pub use events::{InboundMessage, TopicFilter, TransportEvent};
pub use publisher::{InMemoryBroker, InMemoryTransport, Transport, TransportError};
pub use subscriber::{Subscription, SubscriptionError};

/// Messages buffered per observer before the oldest are dropped.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        assert_eq!(DEFAULT_CHANNEL_CAPACITY, 1000);
    }
}
