//! # Domain Layer
//!
//! Pure logic: the record codec, mutation batch decoding, and errors.

pub mod codec;
pub mod entities;
pub mod errors;
