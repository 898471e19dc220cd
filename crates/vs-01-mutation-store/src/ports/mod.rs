//! # Ports Layer
//!
//! - `inbound`: the store API used by the session controller
//! - `outbound`: persistence backends the store writes through

pub mod inbound;
pub mod outbound;
