//! Cross-crate integration flows.

pub mod control_flows;
pub mod persistence;
pub mod session_flows;
