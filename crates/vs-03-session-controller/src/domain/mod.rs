//! Domain layer for the session controller.

pub mod entities;
pub mod errors;
