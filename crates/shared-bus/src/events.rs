//! # Transport Events
//!
//! Items the transport hands to the session loop.

use serde::{Deserialize, Serialize};
use shared_types::topic_suffix;

/// A topic-tagged message delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Full (scoped) topic.
    pub topic: String,
    /// Opaque payload.
    pub payload: Vec<u8>,
}

impl InboundMessage {
    #[must_use]
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }
}

/// Everything the transport can report to the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is (re)established. Subscriptions must be renewed.
    Connected,
    /// A message arrived on a subscribed topic.
    Message(InboundMessage),
    /// The connection dropped. A reconnect may follow.
    Disconnected { reason: String },
}

/// Filter used by broker observers.
#[derive(Debug, Clone, Default)]
pub struct TopicFilter {
    /// Topic suffixes to include. Empty means all topics.
    pub suffixes: Vec<String>,
}

impl TopicFilter {
    /// Accept every message.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Accept messages whose topic ends in one of the given names.
    #[must_use]
    pub fn suffixes<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Self {
        Self {
            suffixes: names.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn matches(&self, message: &InboundMessage) -> bool {
        self.suffixes.is_empty()
            || self
                .suffixes
                .iter()
                .any(|s| s == topic_suffix(&message.topic))
    }
}
