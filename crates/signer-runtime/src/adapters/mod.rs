pub mod settings;

pub use settings::{SettingsError, SettingsStore};
