//! Decode commands: a single typed value, or the outputs of an endpoint call

use anyhow::{Context, Result};

use super::{decode_failure, parse_hex_input, ToolResult};
use crate::domain::abi::{AbiCodec, AbiRegistry};
use crate::infrastructure::abi::{split_result_data, BinaryCodec, CodecConfig, ResultsParser};

/// Decode hex `data` as a value of `type_name`
pub fn decode_type(
    registry: &AbiRegistry,
    config: CodecConfig,
    type_name: &str,
    data: &str,
    nested: bool,
) -> Result<ToolResult> {
    let ty = registry
        .parse_type(type_name)
        .with_context(|| format!("Bad type '{type_name}'"))?;
    let bytes = parse_hex_input(data)?;
    let codec = BinaryCodec::new(registry).with_config(config);

    let target = format!("type '{type_name}'");
    let value = if nested {
        let decoded = codec
            .decode_nested(&bytes, &ty)
            .map_err(|err| decode_failure(err, &target))?;
        if decoded.bytes_read < bytes.len() {
            tracing::warn!(
                bytes_read = decoded.bytes_read,
                total = bytes.len(),
                "nested value does not span the whole input"
            );
        }
        decoded.value
    } else {
        codec
            .decode_top_level(&bytes, &ty)
            .map_err(|err| decode_failure(err, &target))?
    };

    ToolResult::json(&value)
}

/// Decode `@`-separated result data (status first) against an endpoint
pub fn decode_outcome(
    registry: &AbiRegistry,
    config: CodecConfig,
    endpoint: &str,
    data: &str,
) -> Result<ToolResult> {
    let endpoint = registry.get_endpoint(endpoint)?;
    let outputs = split_result_data(data)?;
    let parser = ResultsParser::with_codec(BinaryCodec::new(registry).with_config(config));

    let outcome = parser
        .parse_call_outcome(&outputs, endpoint)
        .map_err(|err| decode_failure(err, format_args!("outputs of '{}'", endpoint.name)))?;
    ToolResult::json(&outcome)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const EXAMPLE_ABI: &str = include_str!("../../../tests/data/example.abi.json");

    fn registry() -> AbiRegistry {
        AbiRegistry::from_json_str(EXAMPLE_ABI).unwrap()
    }

    #[test]
    fn test_decode_type_top_level() {
        let result = decode_type(
            &registry(),
            CodecConfig::default(),
            "DepositEvent",
            "00000000000003db000000",
            false,
        )
        .unwrap();

        assert_eq!(
            result,
            ToolResult::Json(json!({
                "tx_nonce": "987",
                "opt_function": null,
                "opt_arguments": null,
                "opt_gas_limit": null
            }))
        );
    }

    #[test]
    fn test_decode_type_errors() {
        let registry = registry();
        assert!(decode_type(&registry, CodecConfig::default(), "Missing", "", false).is_err());
        assert!(decode_type(&registry, CodecConfig::default(), "u8", "zz", false).is_err());

        let err = decode_type(&registry, CodecConfig::default(), "u8", "0102", false).unwrap_err();
        assert_eq!(err.to_string(), "Data does not match type 'u8'");
        assert!(format!("{err:#}").contains("malformed data"));
    }

    #[test]
    fn test_decode_outcome() {
        let result = decode_outcome(
            &registry(),
            CodecConfig::default(),
            "getPair",
            "@6f6b@07@01",
        )
        .unwrap();
        assert_eq!(
            result,
            ToolResult::Json(json!({ "returnCode": "ok", "values": ["7", true] }))
        );
    }
}
