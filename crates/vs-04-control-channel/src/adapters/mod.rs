//! Adapters for the control channel's outbound ports.

mod envelope;
mod http;
mod memory;

pub use envelope::{encode_response, lightning_hash, Secp256k1Envelope};
pub use http::HttpControlTransport;
pub use memory::{InMemoryNonceStore, LoopbackSigner};
