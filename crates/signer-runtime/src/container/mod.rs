//! # Signer Container
//!
//! Builds the long-lived collaborators from a `RuntimeConfig` and hands out
//! session controllers wired to them.
//!
//! ## Storage Layout
//!
//! One JSON file (`<state_dir>/signer-state.json`) backs everything: the
//! mutation records under `muts/` (base64) and the scalar settings under
//! `settings/`.

pub mod config;
pub mod signer;

pub use config::{ConfigError, RuntimeConfig};
pub use signer::{
    ContainerError, FileMutationStore, FileSettings, HttpControl, RuntimeController,
    SignerContainer,
};
