//! # Ports Layer
//!
//! The guard has no outbound dependencies.

pub mod inbound;
