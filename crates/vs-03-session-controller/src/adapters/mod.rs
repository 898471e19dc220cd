//! Adapters for the session controller's outbound ports.

mod args;
mod scripted;

pub use args::FixedArgsProvider;
pub use scripted::{ScriptedCall, ScriptedEngine};
