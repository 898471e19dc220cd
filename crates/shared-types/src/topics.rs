//! # Topics
//!
//! Pub/sub topic names. Every topic on the wire is scoped under the
//! connection's client id: `<client-id>/<name>`.
//!
//! ## Request / Response Pairs
//!
//! ```text
//! init-1-msg ──→ init-1-res      handshake phase 1
//! init-2-msg ──→ init-2-res      handshake phase 2
//! vls        ──→ vls-res | lss-res
//! lss-msg    ──→ vls-res         checkpoint follow-up
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

pub const VLS: &str = "vls";
pub const VLS_RES: &str = "vls-res";
pub const LSS_MSG: &str = "lss-msg";
pub const LSS_RES: &str = "lss-res";
pub const LSS_CONFLICT: &str = "lss-conflict";
pub const LSS_CONFLICT_RES: &str = "lss-conflict-res";
pub const INIT_1_MSG: &str = "init-1-msg";
pub const INIT_1_RES: &str = "init-1-res";
pub const INIT_2_MSG: &str = "init-2-msg";
pub const INIT_2_RES: &str = "init-2-res";
pub const CONTROL: &str = "control";
pub const CONTROL_RES: &str = "control-res";
pub const PROXY: &str = "proxy";
pub const PROXY_RES: &str = "proxy-res";
pub const ERROR: &str = "error";
pub const HELLO: &str = "hello";
pub const BYE: &str = "bye";

/// Topics the signer subscribes to on every (re)connect.
pub const SIGNER_SUBSCRIPTIONS: [&str; 4] = [VLS, INIT_1_MSG, INIT_2_MSG, LSS_MSG];

/// Build a client-scoped topic: `<client-id>/<name>`.
#[must_use]
pub fn scoped_topic(client_id: &str, name: &str) -> String {
    format!("{client_id}/{name}")
}

/// Last path segment of a topic.
///
/// A topic without any `/` is its own suffix.
#[must_use]
pub fn topic_suffix(topic: &str) -> &str {
    topic.rsplit('/').next().unwrap_or(topic)
}

/// The closed set of inbound request kinds the session layer handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// First handshake message.
    Init1,
    /// Second handshake message.
    Init2,
    /// Steady-state signing round.
    Vls,
    /// Checkpoint follow-up round.
    Lss,
}

impl MessageKind {
    /// All kinds, in subscription order.
    pub const ALL: [MessageKind; 4] = [
        MessageKind::Vls,
        MessageKind::Init1,
        MessageKind::Init2,
        MessageKind::Lss,
    ];

    /// Resolve a kind from a (possibly scoped) topic.
    ///
    /// Returns `None` for topics outside the request set, including the
    /// response topics this layer itself publishes.
    #[must_use]
    pub fn from_topic(topic: &str) -> Option<Self> {
        match topic_suffix(topic) {
            INIT_1_MSG => Some(Self::Init1),
            INIT_2_MSG => Some(Self::Init2),
            VLS => Some(Self::Vls),
            LSS_MSG => Some(Self::Lss),
            _ => None,
        }
    }

    /// The unscoped topic this kind arrives on.
    #[must_use]
    pub fn request_topic(self) -> &'static str {
        match self {
            Self::Init1 => INIT_1_MSG,
            Self::Init2 => INIT_2_MSG,
            Self::Vls => VLS,
            Self::Lss => LSS_MSG,
        }
    }

    /// The unscoped topic the default response for this kind goes to.
    ///
    /// A steady-state round may be redirected to [`LSS_RES`] by the engine.
    #[must_use]
    pub fn response_topic(self) -> &'static str {
        match self {
            Self::Init1 => INIT_1_RES,
            Self::Init2 => INIT_2_RES,
            Self::Vls | Self::Lss => VLS_RES,
        }
    }

    /// Whether this kind belongs to the handshake.
    #[must_use]
    pub fn is_handshake(self) -> bool {
        matches!(self, Self::Init1 | Self::Init2)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.request_topic())
    }
}
