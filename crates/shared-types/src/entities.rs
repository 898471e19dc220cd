//! # Core Domain Entities
//!
//! The argument bundle the signing engine consumes on every call.
//!
//! `Args` is assembled fresh per call from configuration collaborators and
//! is never persisted by the session layer.

use crate::errors::TypeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use zeroize::Zeroize;

/// Snapshot of the engine's persisted state: `name -> (version, payload)`.
pub type State = BTreeMap<String, (i64, Vec<u8>)>;

/// 32-byte seed material.
pub type Seed = [u8; 32];

/// 32-byte freshness nonce handed to the engine for state-server auth.
pub type FreshnessNonce = [u8; 32];

/// Bitcoin network the signer operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Bitcoin,
    Testnet,
    Signet,
    #[default]
    Regtest,
}

impl Network {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Bitcoin => "bitcoin",
            Network::Testnet => "testnet",
            Network::Signet => "signet",
            Network::Regtest => "regtest",
        }
    }
}

impl FromStr for Network {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bitcoin" | "mainnet" => Ok(Network::Bitcoin),
            "testnet" => Ok(Network::Testnet),
            "signet" => Ok(Network::Signet),
            "regtest" => Ok(Network::Regtest),
            other => Err(TypeError::UnknownNetwork(other.to_string())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spending policy interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    Hourly,
    #[default]
    Daily,
}

impl Interval {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Hourly => "hourly",
            Interval::Daily => "daily",
        }
    }
}

impl FromStr for Interval {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hourly" => Ok(Interval::Hourly),
            "daily" => Ok(Interval::Daily),
            other => Err(TypeError::UnknownInterval(other.to_string())),
        }
    }
}

/// Spending policy enforced by the signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Maximum amount spendable per interval (msat).
    pub msat_per_interval: u64,
    /// Interval the amount limit applies to.
    pub interval: Interval,
    /// Maximum amount of a single HTLC (msat).
    pub htlc_limit_msat: u64,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            msat_per_interval: 21_000_000_000,
            interval: Interval::Daily,
            htlc_limit_msat: 1_000_000_000,
        }
    }
}

/// Recent-payment velocity: `(interval start, payment amounts)`.
///
/// Serialized positionally as `[start, [p0, p1, ...]]`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Velocity(pub u64, pub Vec<u64>);

impl Velocity {
    #[must_use]
    pub fn start(&self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn payments(&self) -> &[u64] {
        &self.1
    }
}

/// Arguments for one signing-engine call.
///
/// The seed is wiped from memory when the value is dropped.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Args {
    /// Seed material. Never logged.
    pub seed: Seed,
    /// Network identifier.
    pub network: Network,
    /// Spending policy.
    pub policy: Policy,
    /// Velocity limits, when known.
    pub velocity: Option<Velocity>,
    /// Ordered list of allowed destinations.
    pub allowlist: Vec<String>,
    /// Current time in seconds.
    pub timestamp: u64,
    /// Freshness nonce, distinct from the control nonce.
    pub lss_nonce: FreshnessNonce,
}

impl Args {
    /// Parse a 64-character hex string into seed-sized material.
    pub fn parse_key32(field: &'static str, s: &str) -> Result<[u8; 32], TypeError> {
        let bytes = hex::decode(s.trim()).map_err(|_| TypeError::InvalidHex {
            field,
            expected: 32,
        })?;
        bytes
            .try_into()
            .map_err(|_| TypeError::InvalidHex { field, expected: 32 })
    }
}

impl fmt::Debug for Args {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Args")
            .field("seed", &"<redacted>")
            .field("network", &self.network)
            .field("policy", &self.policy)
            .field("velocity", &self.velocity)
            .field("allowlist", &self.allowlist)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}

impl Drop for Args {
    fn drop(&mut self) {
        self.seed.zeroize();
    }
}
