//! # Adapters
//!
//! Concrete persistence backends.

pub mod base64_text;
pub mod file;
pub mod memory;

pub use base64_text::Base64Backend;
pub use file::FileTextBackend;
pub use memory::{InMemoryRecordBackend, InMemoryTextBackend};
