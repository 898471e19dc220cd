//! Command-line parsing helpers for the admin binary.

use serde_json::Value;
use thiserror::Error;
use vs_04_control_channel::ControlCommand;

/// Errors turning CLI input into a control command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CliError {
    #[error("Invalid JSON content: {0}")]
    InvalidContent(String),

    #[error("Unknown control command {name}: {reason}")]
    UnknownCommand { name: String, reason: String },
}

/// `query-policy` → `QueryPolicy`. Names already in camel case pass through.
#[must_use]
pub fn command_tag(name: &str) -> String {
    name.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}

/// Build a control command from its name and optional JSON content.
pub fn parse_command(name: &str, content: Option<&str>) -> Result<ControlCommand, CliError> {
    let tag = command_tag(name);
    let value = match content {
        None => Value::String(tag),
        Some(raw) => {
            let inner: Value =
                serde_json::from_str(raw).map_err(|e| CliError::InvalidContent(e.to_string()))?;
            let mut object = serde_json::Map::new();
            object.insert(tag, inner);
            Value::Object(object)
        }
    };
    serde_json::from_value(value).map_err(|e| CliError::UnknownCommand {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
