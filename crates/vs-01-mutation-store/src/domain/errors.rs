//! # Store Errors
//!
//! Error types for the mutation store.

use thiserror::Error;

/// Errors from the pure record codec.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    /// The value is shorter than the 8-byte version prefix.
    #[error("Record too short: {len} bytes, need at least 8")]
    ShortRecord { len: usize },

    /// Text value is not valid base64.
    #[error("Invalid base64: {0}")]
    Base64(String),
}

/// Errors that can occur in mutation store operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A persisted record could not be decoded.
    #[error("Corrupt record {name}: {reason}")]
    Corrupt { name: String, reason: CodecError },

    /// The engine's mutation batch could not be decoded.
    #[error("Malformed mutation batch: {0}")]
    MalformedBatch(String),

    /// Some names in a batch failed to persist. Names not listed were written.
    #[error("Partial apply: {written} written, {} failed ({})", .failed.len(), .failed.join(", "))]
    PartialApply { written: usize, failed: Vec<String> },

    /// The persistence backend failed.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Lock poisoned (internal error).
    #[error("Lock poisoned")]
    LockPoisoned,
}
