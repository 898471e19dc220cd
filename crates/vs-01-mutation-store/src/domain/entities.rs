//! # Mutation Entities
//!
//! Records, batches and the engine's msgpack mutation envelope.
//!
//! ## Engine Envelope
//!
//! The engine reports state changes as a msgpack map with one key naming
//! the variant:
//!
//! ```text
//! {"VlsMuts": {"client_hmac": bin(32), "muts": [[name, [version, bin]], ...]}}
//! {"Created": {...same shape...}}
//! {"Init":    {...}}                      no mutations
//! ```

use super::errors::StoreError;
use serde::de::{self, IgnoredAny, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_bytes::ByteBuf;
use shared_types::State;
use std::fmt;

/// Name of the record that carries recent-payment velocity.
pub const VELOCITY_RECORD: &str = "VELOCITY";

/// One named, versioned state fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub name: String,
    pub version: i64,
    pub payload: Vec<u8>,
}

impl MutationRecord {
    #[must_use]
    pub fn new(name: impl Into<String>, version: i64, payload: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            version,
            payload,
        }
    }
}

/// An ordered batch of mutations produced by one engine round.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBatch {
    /// Authentication tag computed by the engine over the batch.
    pub client_hmac: Option<[u8; 32]>,
    /// Records in engine order.
    pub records: Vec<MutationRecord>,
}

impl MutationBatch {
    /// Build a batch from records, without an authentication tag.
    #[must_use]
    pub fn from_records(records: impl IntoIterator<Item = MutationRecord>) -> Self {
        Self {
            client_hmac: None,
            records: records.into_iter().collect(),
        }
    }

    /// Decode the engine's msgpack envelope.
    ///
    /// `Init` responses carry no mutations and decode to an empty batch.
    pub fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        let response: EngineResponse =
            rmp_serde::from_slice(bytes).map_err(|e| StoreError::MalformedBatch(e.to_string()))?;

        let muts = match response {
            EngineResponse::Init(_) => return Ok(Self::default()),
            EngineResponse::Created(m) | EngineResponse::VlsMuts(m) => m,
        };

        let client_hmac: [u8; 32] = muts.client_hmac.as_slice().try_into().map_err(|_| {
            StoreError::MalformedBatch(format!(
                "client_hmac is {} bytes, expected 32",
                muts.client_hmac.len()
            ))
        })?;

        Ok(Self {
            client_hmac: Some(client_hmac),
            records: muts
                .muts
                .into_iter()
                .map(|(name, (version, payload))| MutationRecord {
                    name,
                    version: version.0,
                    payload: payload.into_vec(),
                })
                .collect(),
        })
    }

    /// Encode as a `VlsMuts` envelope, the inverse of [`MutationBatch::decode`].
    pub fn encode(&self) -> Result<Vec<u8>, StoreError> {
        self.encode_as(false)
    }

    /// Encode as a `Created` envelope.
    pub fn encode_created(&self) -> Result<Vec<u8>, StoreError> {
        self.encode_as(true)
    }

    fn encode_as(&self, created: bool) -> Result<Vec<u8>, StoreError> {
        let muts = SignerMutations {
            client_hmac: ByteBuf::from(self.client_hmac.unwrap_or([0u8; 32]).to_vec()),
            muts: self
                .records
                .iter()
                .map(|r| {
                    (
                        r.name.clone(),
                        (WireVersion(r.version), ByteBuf::from(r.payload.clone())),
                    )
                })
                .collect(),
        };
        let response = if created {
            EngineResponse::Created(muts)
        } else {
            EngineResponse::VlsMuts(muts)
        };
        rmp_serde::to_vec_named(&response).map_err(|e| StoreError::MalformedBatch(e.to_string()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Collapse into a snapshot view. Later records win on duplicate names.
    #[must_use]
    pub fn to_state(&self) -> State {
        self.records
            .iter()
            .map(|r| (r.name.clone(), (r.version, r.payload.clone())))
            .collect()
    }

    /// Recent-payment velocity carried by the [`VELOCITY_RECORD`], if any.
    ///
    /// The record payload is a structured value (JSON, or msgpack) whose
    /// second positional element is the list of payment amounts. Any other
    /// shape yields `None`.
    #[must_use]
    pub fn velocity(&self) -> Option<Vec<u64>> {
        let record = self.records.iter().rev().find(|r| r.name == VELOCITY_RECORD)?;
        velocity_from_payload(&record.payload)
    }
}

/// Extract the payment list from a velocity payload.
#[must_use]
pub fn velocity_from_payload(payload: &[u8]) -> Option<Vec<u64>> {
    let value: serde_json::Value = serde_json::from_slice(payload)
        .ok()
        .or_else(|| rmp_serde::from_slice(payload).ok())?;
    value
        .get(1)?
        .as_array()?
        .iter()
        .map(serde_json::Value::as_u64)
        .collect()
}

/// Result of applying a batch: which names landed, which did not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub written: Vec<String>,
    pub failed: Vec<String>,
}

impl ApplyReport {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

// =============================================================================
// WIRE FORMAT
// =============================================================================

#[derive(Serialize, Deserialize)]
enum EngineResponse {
    Init(IgnoredAnyInit),
    Created(SignerMutations),
    VlsMuts(SignerMutations),
}

/// Placeholder for the `Init` payload, which this store never reads.
struct IgnoredAnyInit;

impl<'de> Deserialize<'de> for IgnoredAnyInit {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        IgnoredAny::deserialize(d).map(|_| IgnoredAnyInit)
    }
}

impl Serialize for IgnoredAnyInit {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_unit()
    }
}

#[derive(Serialize, Deserialize)]
struct SignerMutations {
    client_hmac: ByteBuf,
    muts: Vec<(String, (WireVersion, ByteBuf))>,
}

/// Engine versions travel as msgpack integers. Unsigned values above
/// `i64::MAX` are reinterpreted bit-for-bit.
struct WireVersion(i64);

impl Serialize for WireVersion {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for WireVersion {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct VersionVisitor;

        impl<'de> Visitor<'de> for VersionVisitor {
            type Value = WireVersion;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a 64-bit integer version")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(WireVersion(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(WireVersion(v as i64))
            }
        }

        d.deserialize_i64(VersionVisitor)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_three_record_batch() {
        let batch = MutationBatch::decode(&fixtures::three_record_batch()).unwrap();
        assert_eq!(batch.client_hmac, Some([255u8; 32]));
        assert_eq!(
            batch.records,
            vec![
                MutationRecord::new("aaaa", 15, vec![255, 255, 255]),
                MutationRecord::new("bbbb", 15, vec![255, 255, 255]),
                MutationRecord::new("cccc", 15, vec![255, 255, 255]),
            ]
        );
    }

    #[test]
    fn test_encode_decode_preserves_signed_versions() {
        let batch = MutationBatch {
            client_hmac: Some([1u8; 32]),
            records: vec![
                MutationRecord::new("neg", -5, vec![1]),
                MutationRecord::new("max", i64::MAX, vec![]),
                MutationRecord::new("min", i64::MIN, vec![2, 3]),
            ],
        };
        let decoded = MutationBatch::decode(&batch.encode().unwrap()).unwrap();
        assert_eq!(decoded, batch);

        let created = MutationBatch::decode(&batch.encode_created().unwrap()).unwrap();
        assert_eq!(created, batch);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            MutationBatch::decode(&[0xC1, 0x00]),
            Err(StoreError::MalformedBatch(_))
        ));
    }

    #[test]
    fn test_decode_rejects_short_hmac() {
        let mut bytes = vec![
            129, 167, 86, 108, 115, 77, 117, 116, 115, 130, 171, 99, 108, 105, 101, 110, 116, 95,
            104, 109, 97, 99, 196, 2, 1, 2,
        ];
        bytes.extend_from_slice(&[164, 109, 117, 116, 115, 144]);
        assert!(matches!(
            MutationBatch::decode(&bytes),
            Err(StoreError::MalformedBatch(_))
        ));
    }

    #[test]
    fn test_to_state_last_write_wins() {
        let batch = MutationBatch::from_records([
            MutationRecord::new("a", 1, vec![1]),
            MutationRecord::new("a", 2, vec![2]),
        ]);
        let state = batch.to_state();
        assert_eq!(state.len(), 1);
        assert_eq!(state["a"], (2, vec![2]));
    }

    #[test]
    fn test_velocity_from_json_record() {
        let batch = MutationBatch::from_records([
            MutationRecord::new("chan", 1, vec![]),
            MutationRecord::new(VELOCITY_RECORD, 3, b"[1700000000,[1000,2500]]".to_vec()),
        ]);
        assert_eq!(batch.velocity(), Some(vec![1000, 2500]));
    }

    #[test]
    fn test_velocity_absent_or_malformed() {
        let none = MutationBatch::from_records([MutationRecord::new("chan", 1, vec![])]);
        assert_eq!(none.velocity(), None);

        for payload in [&b"[1700000000, 5]"[..], b"{}", b"[1]", b"\xff\xff", b"[0,[1,\"x\"]]"] {
            let batch =
                MutationBatch::from_records([MutationRecord::new(VELOCITY_RECORD, 1, payload.to_vec())]);
            assert_eq!(batch.velocity(), None, "payload {payload:?}");
        }
    }

    #[test]
    fn test_velocity_from_msgpack_record() {
        // [7, [10, 20]]
        let payload = vec![0x92, 0x07, 0x92, 0x0A, 0x14];
        assert_eq!(velocity_from_payload(&payload), Some(vec![10, 20]));
    }

    #[test]
    fn test_apply_report_complete() {
        assert!(ApplyReport::default().is_complete());
        let report = ApplyReport {
            written: vec![],
            failed: vec!["x".into()],
        };
        assert!(!report.is_complete());
    }
}
