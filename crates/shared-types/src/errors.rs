//! # Error Types
//!
//! Errors raised while building or parsing shared entities.

use thiserror::Error;

/// Errors from parsing shared entities.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    /// Unknown network name.
    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    /// Unknown policy interval name.
    #[error("Unknown interval: {0}")]
    UnknownInterval(String),

    /// Hex-encoded material has the wrong length or alphabet.
    #[error("Invalid {field}: expected {expected} hex-encoded bytes")]
    InvalidHex { field: &'static str, expected: usize },
}
