//! Toolkit commands for decoding and encoding contract data
//!
//! Each command takes an already loaded registry and returns a
//! [`ToolResult`]; the binary only prints it.

pub mod decode;
pub mod encode;
pub mod event;
pub mod inspect;

use std::fmt;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::abi::AbiError;

pub use decode::{decode_outcome, decode_type};
pub use encode::{call_data, encode_value};
pub use event::decode_event;
pub use inspect::describe_abi;

/// Result of a toolkit operation
#[derive(Debug, Clone, PartialEq)]
pub enum ToolResult {
    /// Structured output, printed as pretty JSON
    Json(serde_json::Value),
    /// Plain output such as hex or call data
    Text(String),
}

impl ToolResult {
    pub fn json(value: &impl Serialize) -> Result<Self> {
        let value = serde_json::to_value(value).context("Failed to render result as JSON")?;
        Ok(Self::Json(value))
    }

    pub fn render(&self) -> Result<String> {
        match self {
            Self::Json(value) => {
                serde_json::to_string_pretty(value).context("Failed to render result as JSON")
            }
            Self::Text(text) => Ok(text.clone()),
        }
    }
}

/// Payload errors get the decode target as context; ABI errors pass through
pub(crate) fn decode_failure(err: AbiError, target: impl fmt::Display) -> anyhow::Error {
    if err.is_data_error() {
        anyhow::Error::new(err).context(format!("Data does not match {target}"))
    } else {
        err.into()
    }
}

/// Hex input with an optional `0x` prefix; whitespace is ignored
pub(crate) fn parse_hex_input(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let digits: String = digits.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(&digits).with_context(|| format!("Invalid hex data: {input}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_input() {
        assert_eq!(parse_hex_input("0x0a0B").unwrap(), vec![0x0a, 0x0b]);
        assert_eq!(parse_hex_input(" 01 02 ").unwrap(), vec![0x01, 0x02]);
        assert!(parse_hex_input("").unwrap().is_empty());
        assert!(parse_hex_input("abc").is_err());
    }

    #[test]
    fn test_decode_failure_context() {
        let err = decode_failure(AbiError::malformed("short buffer"), "type 'u32'");
        assert_eq!(err.to_string(), "Data does not match type 'u32'");
        assert!(matches!(
            err.downcast_ref::<AbiError>(),
            Some(AbiError::MalformedData(_))
        ));

        let err = decode_failure(AbiError::UnresolvedType("Missing".into()), "type 'Missing'");
        assert_eq!(err.to_string(), "unresolved type 'Missing'");
    }

    #[test]
    fn test_render() {
        let result = ToolResult::json(&serde_json::json!({ "a": "1" })).unwrap();
        assert_eq!(result.render().unwrap(), "{\n  \"a\": \"1\"\n}");
        assert_eq!(ToolResult::Text("ab".into()).render().unwrap(), "ab");
    }
}
