//! Encode commands: a single value, or endpoint call data

use anyhow::{Context, Result};
use serde_json::Value;

use super::ToolResult;
use crate::domain::abi::{AbiCodec, AbiRegistry};
use crate::infrastructure::abi::{
    build_call_data, native_arguments, native_to_typed, BinaryCodec, CodecConfig,
};

/// Encode a JSON value as `type_name`; prints hex
pub fn encode_value(
    registry: &AbiRegistry,
    config: CodecConfig,
    type_name: &str,
    value: &str,
    nested: bool,
) -> Result<ToolResult> {
    let ty = registry
        .parse_type(type_name)
        .with_context(|| format!("Bad type '{type_name}'"))?;
    let json = parse_json_input(value)?;
    let typed = native_to_typed(&json, &ty, registry)?;
    let codec = BinaryCodec::new(registry).with_config(config);

    let bytes = if nested {
        codec.encode_nested(&typed, &ty)?
    } else {
        codec.encode_top_level(&typed, &ty)?
    };
    Ok(ToolResult::Text(hex::encode(bytes)))
}

/// Build `endpoint@arg@arg...` from a JSON array of arguments
pub fn call_data(
    registry: &AbiRegistry,
    config: CodecConfig,
    endpoint: &str,
    args: &str,
) -> Result<ToolResult> {
    let endpoint = registry.get_endpoint(endpoint)?;
    let args = match parse_json_input(args)? {
        Value::Array(items) => items,
        other => anyhow::bail!("Arguments must be a JSON array, got {other}"),
    };
    let values = native_arguments(&args, endpoint, registry)?;
    let codec = BinaryCodec::new(registry).with_config(config);

    Ok(ToolResult::Text(build_call_data(&codec, endpoint, &values)?))
}

/// JSON, falling back to a bare string so `--value EGLD` works
fn parse_json_input(input: &str) -> Result<Value> {
    match serde_json::from_str(input) {
        Ok(value) => Ok(value),
        Err(_) if !input.trim_start().starts_with(['{', '[', '"']) => {
            Ok(Value::String(input.to_string()))
        }
        Err(err) => Err(err).with_context(|| format!("Invalid JSON value: {input}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE_ABI: &str = include_str!("../../../tests/data/example.abi.json");

    fn registry() -> AbiRegistry {
        AbiRegistry::from_json_str(EXAMPLE_ABI).unwrap()
    }

    #[test]
    fn test_encode_value() {
        let registry = registry();
        let config = CodecConfig::default();

        assert_eq!(
            encode_value(&registry, config, "BigUint", "1001", false).unwrap(),
            ToolResult::Text("03e9".into())
        );
        assert_eq!(
            encode_value(&registry, config, "TokenIdentifier", "EGLD", true).unwrap(),
            ToolResult::Text("0000000445474c44".into())
        );
        assert_eq!(
            encode_value(&registry, config, "Option<u32>", "7", true).unwrap(),
            ToolResult::Text("0100000007".into())
        );
        assert!(encode_value(&registry, config, "u8", "256", false).is_err());
        assert!(encode_value(&registry, config, "List<u8>", "[1,", false).is_err());
    }

    #[test]
    fn test_call_data() {
        let registry = registry();
        let result = call_data(
            &registry,
            CodecConfig::default(),
            "getBalances",
            r#"["EGLD", "USDC-123456"]"#,
        )
        .unwrap();
        assert_eq!(
            result,
            ToolResult::Text(format!(
                "getBalances@{}@{}",
                hex::encode("EGLD"),
                hex::encode("USDC-123456")
            ))
        );

        assert!(call_data(&registry, CodecConfig::default(), "getBalances", "{}").is_err());
        assert!(call_data(&registry, CodecConfig::default(), "nope", "[]").is_err());
    }
}
