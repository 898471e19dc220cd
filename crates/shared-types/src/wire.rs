//! # Wire Helpers
//!
//! Read-only peeks into engine payloads. The session layer never parses
//! engine messages beyond the fixed header.
//!
//! ## Steady-State Header
//!
//! ```text
//! 0xAA 0x55 | seq (u16, big-endian) | ...
//! ```

/// Magic bytes that open every steady-state request.
pub const VLS_MAGIC: [u8; 2] = [0xAA, 0x55];

/// Read the sequence number embedded in a steady-state request.
///
/// Returns `None` when the payload is too short or the magic is absent.
#[must_use]
pub fn peek_vls_sequence(payload: &[u8]) -> Option<u16> {
    match payload {
        [m0, m1, hi, lo, ..] if [*m0, *m1] == VLS_MAGIC => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}
