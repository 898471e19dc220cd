//! # Domain Layer
//!
//! The session value, the pure validation rules, and errors.

pub mod errors;
pub mod guard;
pub mod session;
