//! # Control Commands and Responses
//!
//! Both travel as externally tagged JSON: unit variants are bare strings
//! (`"Nonce"`), variants with content are single-key objects
//! (`{"UpdateAllowlist":["..."]}`).

use serde::{Deserialize, Serialize};
use shared_types::{Policy, Velocity};

/// Over-the-air update request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtaParams {
    pub version: u64,
    pub url: String,
    /// Hex sha256 of the firmware image.
    pub sha256_hash: String,
    /// Signature over `sha256_hash`, base64.
    pub message_sig: String,
}

/// Everything the signer reports for `QueryAll`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct All {
    pub policy: Policy,
    pub allowlist: Vec<String>,
    pub velocity: Option<Velocity>,
}

/// Administrative command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlCommand {
    Nonce,
    ResetWifi,
    ResetKeys,
    ResetAll,
    QueryPolicy,
    UpdatePolicy(Policy),
    QueryAllowlist,
    UpdateAllowlist(Vec<String>),
    QueryVelocity,
    Ota(OtaParams),
    QueryAll,
}

impl ControlCommand {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ControlCommand::Nonce => "Nonce",
            ControlCommand::ResetWifi => "ResetWifi",
            ControlCommand::ResetKeys => "ResetKeys",
            ControlCommand::ResetAll => "ResetAll",
            ControlCommand::QueryPolicy => "QueryPolicy",
            ControlCommand::UpdatePolicy(_) => "UpdatePolicy",
            ControlCommand::QueryAllowlist => "QueryAllowlist",
            ControlCommand::UpdateAllowlist(_) => "UpdateAllowlist",
            ControlCommand::QueryVelocity => "QueryVelocity",
            ControlCommand::Ota(_) => "Ota",
            ControlCommand::QueryAll => "QueryAll",
        }
    }

    /// Compact JSON payload that gets signed.
    pub fn to_payload(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Signer's answer to a [`ControlCommand`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlResponse {
    Nonce(u64),
    ResetWifi,
    ResetKeys,
    ResetAll,
    PolicyCurrent(Policy),
    PolicyUpdated(Policy),
    AllowlistCurrent(Vec<String>),
    AllowlistUpdated(Vec<String>),
    VelocityCurrent(Option<Velocity>),
    OtaConfirm(OtaParams),
    AllCurrent(All),
    Error(String),
}

impl ControlResponse {
    /// Whether this is the response kind `command` expects.
    ///
    /// `Error` answers nothing; callers surface it separately.
    #[must_use]
    pub fn answers(&self, command: &ControlCommand) -> bool {
        matches!(
            (command, self),
            (ControlCommand::Nonce, ControlResponse::Nonce(_))
                | (ControlCommand::ResetWifi, ControlResponse::ResetWifi)
                | (ControlCommand::ResetKeys, ControlResponse::ResetKeys)
                | (ControlCommand::ResetAll, ControlResponse::ResetAll)
                | (ControlCommand::QueryPolicy, ControlResponse::PolicyCurrent(_))
                | (ControlCommand::UpdatePolicy(_), ControlResponse::PolicyUpdated(_))
                | (ControlCommand::QueryAllowlist, ControlResponse::AllowlistCurrent(_))
                | (ControlCommand::UpdateAllowlist(_), ControlResponse::AllowlistUpdated(_))
                | (ControlCommand::QueryVelocity, ControlResponse::VelocityCurrent(_))
                | (ControlCommand::Ota(_), ControlResponse::OtaConfirm(_))
                | (ControlCommand::QueryAll, ControlResponse::AllCurrent(_))
        )
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ControlResponse::Nonce(_) => "Nonce",
            ControlResponse::ResetWifi => "ResetWifi",
            ControlResponse::ResetKeys => "ResetKeys",
            ControlResponse::ResetAll => "ResetAll",
            ControlResponse::PolicyCurrent(_) => "PolicyCurrent",
            ControlResponse::PolicyUpdated(_) => "PolicyUpdated",
            ControlResponse::AllowlistCurrent(_) => "AllowlistCurrent",
            ControlResponse::AllowlistUpdated(_) => "AllowlistUpdated",
            ControlResponse::VelocityCurrent(_) => "VelocityCurrent",
            ControlResponse::OtaConfirm(_) => "OtaConfirm",
            ControlResponse::AllCurrent(_) => "AllCurrent",
            ControlResponse::Error(_) => "Error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_command_is_bare_string() {
        assert_eq!(
            String::from_utf8(ControlCommand::Nonce.to_payload().unwrap()).unwrap(),
            "\"Nonce\""
        );
    }

    #[test]
    fn test_command_with_content() {
        let json = serde_json::to_string(&ControlCommand::UpdateAllowlist(vec![
            "a".to_string(),
        ]))
        .unwrap();
        assert_eq!(json, r#"{"UpdateAllowlist":["a"]}"#);

        let back: ControlCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name(), "UpdateAllowlist");
    }

    #[test]
    fn test_response_decodes() {
        let r: ControlResponse = serde_json::from_str(r#"{"Nonce":42}"#).unwrap();
        assert_eq!(r, ControlResponse::Nonce(42));

        let r: ControlResponse =
            serde_json::from_str(r#"{"VelocityCurrent":[1700000000,[5,10]]}"#).unwrap();
        assert_eq!(
            r,
            ControlResponse::VelocityCurrent(Some(Velocity(1_700_000_000, vec![5, 10])))
        );
    }

    #[test]
    fn test_answers_matches_kind() {
        assert!(ControlResponse::Nonce(1).answers(&ControlCommand::Nonce));
        assert!(ControlResponse::PolicyUpdated(Policy::default())
            .answers(&ControlCommand::UpdatePolicy(Policy::default())));
        assert!(!ControlResponse::PolicyCurrent(Policy::default())
            .answers(&ControlCommand::UpdatePolicy(Policy::default())));
        assert!(!ControlResponse::Error("x".into()).answers(&ControlCommand::Nonce));
    }
}
