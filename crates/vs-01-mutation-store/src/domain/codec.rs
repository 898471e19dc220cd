//! # Record Codec
//!
//! The one place where a record's version and payload are joined into the
//! persisted byte string and split back apart.
//!
//! ```text
//! ┌──────────────────────────────┬─────────────────┐
//! │ version: i64, little-endian  │ payload         │
//! │ 8 bytes, two's complement    │ 0..n bytes      │
//! └──────────────────────────────┴─────────────────┘
//! ```

use super::errors::CodecError;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

/// Width of the version prefix.
pub const VERSION_LEN: usize = 8;

/// Join a version and payload into the persisted byte string.
#[must_use]
pub fn encode_record(version: i64, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(VERSION_LEN + payload.len());
    out.extend_from_slice(&version.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

/// Split a persisted byte string into version and payload.
pub fn decode_record(bytes: &[u8]) -> Result<(i64, Vec<u8>), CodecError> {
    if bytes.len() < VERSION_LEN {
        return Err(CodecError::ShortRecord { len: bytes.len() });
    }
    let (prefix, payload) = bytes.split_at(VERSION_LEN);
    let mut version = [0u8; VERSION_LEN];
    version.copy_from_slice(prefix);
    Ok((i64::from_le_bytes(version), payload.to_vec()))
}

/// [`encode_record`] followed by standard base64.
#[must_use]
pub fn encode_text(version: i64, payload: &[u8]) -> String {
    BASE64.encode(encode_record(version, payload))
}

/// Base64 decode followed by [`decode_record`].
pub fn decode_text(text: &str) -> Result<(i64, Vec<u8>), CodecError> {
    let bytes = BASE64
        .decode(text.trim())
        .map_err(|e| CodecError::Base64(e.to_string()))?;
    decode_record(&bytes)
}
