//! # Signer Runtime Library
//!
//! Everything around the session layer that a deployed signer needs:
//! configuration, persisted settings, collaborator wiring, the session
//! run loop, and the admin CLI helpers. The `signer-runtime` binary is a
//! thin shell over this library.
//!
//! ## Modules
//!
//! - `container/` - configuration and collaborator wiring
//! - `adapters/` - persisted settings (seed, nonces, policy)
//! - `runner` - the reconnecting session loop
//! - `cli` - control-command parsing for the binary

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![allow(clippy::type_complexity)]

pub mod adapters;
pub mod cli;
pub mod container;
pub mod runner;

pub use adapters::{SettingsError, SettingsStore};
pub use cli::{parse_command, CliError};
pub use container::{ConfigError, ContainerError, RuntimeConfig, SignerContainer};
pub use runner::{RunnerStats, SessionRunner, StopReason};
