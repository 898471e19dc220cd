//! Domain layer for the control channel.

pub mod commands;
pub mod errors;
