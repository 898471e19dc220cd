//! # Control Channel Errors

use thiserror::Error;

/// Errors from control channel operations.
///
/// A failed send never rolls back the nonce it consumed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ControlError {
    /// The command could not be serialized.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// The envelope could not be signed or verified.
    #[error("Envelope error: {0}")]
    Envelope(String),

    /// The secret key is malformed.
    #[error("Invalid control key: {0}")]
    InvalidKey(String),

    /// The nonce could not be loaded or persisted.
    #[error("Nonce store error: {0}")]
    Nonce(String),

    /// The request never got a usable HTTP response.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The endpoint answered with a non-success status.
    #[error("Control endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The signer answered with an explicit error.
    #[error("Signer error: {0}")]
    Remote(String),

    /// The signer answered with the wrong kind of response.
    #[error("Unexpected response to {command}: {got}")]
    UnexpectedResponse { command: &'static str, got: String },
}
