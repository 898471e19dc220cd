//! # Inbound Ports (Driving Ports / API)
//!
//! The administrative surface. `send` is the primitive; the rest are typed
//! wrappers that unpack the expected response kind.

use crate::domain::commands::{All, ControlCommand, ControlResponse, OtaParams};
use crate::domain::errors::ControlError;
use async_trait::async_trait;
use shared_types::{Policy, Velocity};

fn unexpected(command: &ControlCommand, got: &ControlResponse) -> ControlError {
    ControlError::UnexpectedResponse {
        command: command.name(),
        got: got.name().to_string(),
    }
}

/// Control Channel API.
#[async_trait]
pub trait ControlApi: Send + Sync {
    /// Sign and deliver one command, consuming the next nonce.
    ///
    /// # Errors
    /// * `ControlError::Remote` - the signer answered `Error`
    /// * `ControlError::UnexpectedResponse` - the answer is the wrong kind
    async fn send(&self, command: ControlCommand) -> Result<ControlResponse, ControlError>;

    /// Raise the local nonce to at least `remote`. Returns the new value.
    async fn fast_forward(&self, remote: u64) -> Result<u64, ControlError>;

    /// Ask the signer for its nonce and catch up with it.
    async fn query_nonce(&self) -> Result<u64, ControlError> {
        let command = ControlCommand::Nonce;
        match self.send(command.clone()).await? {
            ControlResponse::Nonce(remote) => {
                self.fast_forward(remote).await?;
                Ok(remote)
            }
            other => Err(unexpected(&command, &other)),
        }
    }

    async fn query_policy(&self) -> Result<Policy, ControlError> {
        let command = ControlCommand::QueryPolicy;
        match self.send(command.clone()).await? {
            ControlResponse::PolicyCurrent(policy) => Ok(policy),
            other => Err(unexpected(&command, &other)),
        }
    }

    async fn update_policy(&self, policy: Policy) -> Result<Policy, ControlError> {
        let command = ControlCommand::UpdatePolicy(policy);
        match self.send(command.clone()).await? {
            ControlResponse::PolicyUpdated(policy) => Ok(policy),
            other => Err(unexpected(&command, &other)),
        }
    }

    async fn query_allowlist(&self) -> Result<Vec<String>, ControlError> {
        let command = ControlCommand::QueryAllowlist;
        match self.send(command.clone()).await? {
            ControlResponse::AllowlistCurrent(list) => Ok(list),
            other => Err(unexpected(&command, &other)),
        }
    }

    async fn update_allowlist(&self, allowlist: Vec<String>) -> Result<Vec<String>, ControlError> {
        let command = ControlCommand::UpdateAllowlist(allowlist);
        match self.send(command.clone()).await? {
            ControlResponse::AllowlistUpdated(list) => Ok(list),
            other => Err(unexpected(&command, &other)),
        }
    }

    async fn query_velocity(&self) -> Result<Option<Velocity>, ControlError> {
        let command = ControlCommand::QueryVelocity;
        match self.send(command.clone()).await? {
            ControlResponse::VelocityCurrent(velocity) => Ok(velocity),
            other => Err(unexpected(&command, &other)),
        }
    }

    async fn query_all(&self) -> Result<All, ControlError> {
        let command = ControlCommand::QueryAll;
        match self.send(command.clone()).await? {
            ControlResponse::AllCurrent(all) => Ok(all),
            other => Err(unexpected(&command, &other)),
        }
    }

    async fn ota(&self, params: OtaParams) -> Result<OtaParams, ControlError> {
        let command = ControlCommand::Ota(params);
        match self.send(command.clone()).await? {
            ControlResponse::OtaConfirm(params) => Ok(params),
            other => Err(unexpected(&command, &other)),
        }
    }

    async fn reset_wifi(&self) -> Result<(), ControlError> {
        self.send(ControlCommand::ResetWifi).await.map(|_| ())
    }

    async fn reset_keys(&self) -> Result<(), ControlError> {
        self.send(ControlCommand::ResetKeys).await.map(|_| ())
    }

    async fn reset_all(&self) -> Result<(), ControlError> {
        self.send(ControlCommand::ResetAll).await.map(|_| ())
    }
}
