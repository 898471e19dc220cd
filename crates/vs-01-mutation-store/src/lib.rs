//! # Versioned Mutation Store (VS-01)
//!
//! Persists the signing engine's state as independently-versioned byte
//! records and rebuilds the snapshot the engine consumes on every call.
//!
//! ## Architecture
//!
//! - **Domain Layer** (`domain/`): record codec, mutation batches, errors
//! - **Ports Layer** (`ports/`): `MutationStoreApi` in, record/text backends out
//! - **Adapters** (`adapters/`): in-memory, base64-over-text and file backends
//! - **Service Layer** (`service.rs`): the store itself
//!
//! ## Persisted Encoding
//!
//! ```text
//! key   = "muts/" + name
//! value = version (i64, 8 bytes little-endian) || payload
//! ```
//!
//! Text-only backends carry the same bytes base64-encoded.
//!
//! ## Guarantees
//!
//! - The store never invents or compares versions; it persists what the
//!   engine hands it (last write wins).
//! - Each name is written independently, so a failed batch may leave some
//!   names updated. `apply` reports exactly which ones failed.
//! - A stored value shorter than the version prefix is corruption, never
//!   version zero.

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{Base64Backend, FileTextBackend, InMemoryRecordBackend, InMemoryTextBackend};
pub use domain::codec::{decode_record, decode_text, encode_record, encode_text};
pub use domain::entities::{ApplyReport, MutationBatch, MutationRecord, VELOCITY_RECORD};
pub use domain::errors::{CodecError, StoreError};
pub use ports::inbound::MutationStoreApi;
pub use ports::outbound::{RecordBackend, TextBackend};
pub use service::{MutationStoreService, RECORD_PREFIX};
