//! secp256k1 envelope signer.
//!
//! ```text
//! envelope = hex( payload || nonce (u64 BE) || sig65 )
//! sig65    = (recovery_id + 31) || r || s
//! digest   = sha256(sha256("Lightning Signed Message:" || payload || nonce))
//! ```

use crate::domain::commands::ControlResponse;
use crate::domain::errors::ControlError;
use crate::ports::outbound::EnvelopeSigner;
use k256::ecdsa::{RecoveryId, Signature, SigningKey, VerifyingKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

const MESSAGE_PREFIX: &[u8] = b"Lightning Signed Message:";
const NONCE_LEN: usize = 8;
const SIG_LEN: usize = 65;
/// Header byte offset marking a compressed public key.
const RECOVERY_OFFSET: u8 = 31;

/// Double SHA-256 of the prefixed message.
#[must_use]
pub fn lightning_hash(message: &[u8]) -> [u8; 32] {
    let first = Sha256::new()
        .chain_update(MESSAGE_PREFIX)
        .chain_update(message)
        .finalize();
    Sha256::digest(first).into()
}

/// Hex-encoded JSON, the form the endpoint answers in.
pub fn encode_response(response: &ControlResponse) -> Result<String, ControlError> {
    let json = serde_json::to_vec(response).map_err(|e| ControlError::Serialization(e.to_string()))?;
    Ok(hex::encode(json))
}

/// Signs control envelopes with a secp256k1 key.
pub struct Secp256k1Envelope {
    key: SigningKey,
}

impl Secp256k1Envelope {
    #[must_use]
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Fresh random key.
    #[must_use]
    pub fn random() -> Self {
        Self::new(SigningKey::random(&mut rand::rngs::OsRng))
    }

    /// Parse a 32-byte hex secret.
    pub fn from_secret_hex(secret: &str) -> Result<Self, ControlError> {
        let bytes = Zeroizing::new(
            hex::decode(secret.trim()).map_err(|e| ControlError::InvalidKey(e.to_string()))?,
        );
        let key = SigningKey::from_slice(&bytes).map_err(|e| ControlError::InvalidKey(e.to_string()))?;
        Ok(Self::new(key))
    }

    #[must_use]
    pub fn verifying_key(&self) -> VerifyingKey {
        *self.key.verifying_key()
    }

    #[must_use]
    pub fn secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(hex::encode(self.key.to_bytes()))
    }

    /// Verify an envelope against `expected` and split it into payload and
    /// nonce. This is the check the signer runs on every command.
    pub fn open_request(envelope: &str, expected: &VerifyingKey) -> Result<(Vec<u8>, u64), ControlError> {
        let bytes = hex::decode(envelope.trim()).map_err(|e| ControlError::Envelope(e.to_string()))?;
        if bytes.len() < NONCE_LEN + SIG_LEN {
            return Err(ControlError::Envelope(format!(
                "envelope too short: {} bytes",
                bytes.len()
            )));
        }

        let (signed, sig) = bytes.split_at(bytes.len() - SIG_LEN);
        let recovery_id = sig[0]
            .checked_sub(RECOVERY_OFFSET)
            .and_then(RecoveryId::from_byte)
            .ok_or_else(|| ControlError::Envelope(format!("bad recovery header {}", sig[0])))?;
        let signature =
            Signature::from_slice(&sig[1..]).map_err(|e| ControlError::Envelope(e.to_string()))?;
        let recovered =
            VerifyingKey::recover_from_prehash(&lightning_hash(signed), &signature, recovery_id)
                .map_err(|e| ControlError::Envelope(e.to_string()))?;
        if &recovered != expected {
            return Err(ControlError::Envelope("signed by unexpected key".to_string()));
        }

        let (payload, nonce) = signed.split_at(signed.len() - NONCE_LEN);
        let nonce: [u8; NONCE_LEN] = nonce
            .try_into()
            .map_err(|_| ControlError::Envelope("bad nonce field".to_string()))?;
        Ok((payload.to_vec(), u64::from_be_bytes(nonce)))
    }
}

impl EnvelopeSigner for Secp256k1Envelope {
    fn seal(&self, payload: &[u8], nonce: u64) -> Result<String, ControlError> {
        let mut message = Vec::with_capacity(payload.len() + NONCE_LEN + SIG_LEN);
        message.extend_from_slice(payload);
        message.extend_from_slice(&nonce.to_be_bytes());

        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&lightning_hash(&message))
            .map_err(|e| ControlError::Envelope(e.to_string()))?;
        message.push(recovery_id.to_byte() + RECOVERY_OFFSET);
        message.extend_from_slice(&signature.to_bytes());
        Ok(hex::encode(message))
    }

    fn open_response(&self, body: &str) -> Result<Vec<u8>, ControlError> {
        hex::decode(body.trim()).map_err(|e| ControlError::Parse(e.to_string()))
    }
}
