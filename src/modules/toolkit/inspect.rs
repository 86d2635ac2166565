//! ABI summary: endpoints, events and custom types with their type names

use anyhow::Result;
use serde_json::{json, Value};

use super::ToolResult;
use crate::domain::abi::{AbiRegistry, CustomType, EndpointDefinition, EventInput, ParamSpec};

/// Describe everything a loaded ABI declares
pub fn describe_abi(registry: &AbiRegistry) -> Result<ToolResult> {
    let endpoints: Vec<Value> = registry.endpoints().map(endpoint).collect();
    let events: Vec<Value> = registry
        .events()
        .map(|event| {
            json!({
                "identifier": event.identifier,
                "topics": event.topics().map(event_input).collect::<Vec<_>>(),
                "data": event.data().map(event_input).collect::<Vec<_>>(),
            })
        })
        .collect();
    let types: Vec<Value> = registry.custom_types().map(custom_type).collect();

    Ok(ToolResult::Json(json!({
        "name": registry.name,
        "constructor": registry.constructor.as_ref().map(endpoint),
        "endpoints": endpoints,
        "events": events,
        "types": types,
    })))
}

fn endpoint(def: &EndpointDefinition) -> Value {
    json!({
        "name": def.name,
        "mutability": def.mutability,
        "inputs": def.inputs.iter().map(param).collect::<Vec<_>>(),
        "outputs": def.outputs.iter().map(param).collect::<Vec<_>>(),
    })
}

fn param(spec: &ParamSpec) -> Value {
    json!({ "name": spec.name, "type": spec.ty.to_string() })
}

fn event_input(input: &EventInput) -> Value {
    json!({ "name": input.name, "type": input.ty.to_string() })
}

fn custom_type(custom: &CustomType) -> Value {
    match custom {
        CustomType::Struct(def) => json!({
            "name": def.name,
            "kind": "struct",
            "fields": def
                .fields
                .iter()
                .map(|field| json!({ "name": field.name, "type": field.ty.to_string() }))
                .collect::<Vec<_>>(),
        }),
        CustomType::Enum(def) => json!({
            "name": def.name,
            "kind": "enum",
            "variants": def
                .variants
                .iter()
                .map(|variant| {
                    json!({ "name": variant.name, "discriminant": variant.discriminant })
                })
                .collect::<Vec<_>>(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE_ABI: &str = include_str!("../../../tests/data/example.abi.json");

    #[test]
    fn test_describe_abi() {
        let registry = AbiRegistry::from_json_str(EXAMPLE_ABI).unwrap();
        let ToolResult::Json(summary) = describe_abi(&registry).unwrap() else {
            panic!("expected JSON output");
        };

        assert_eq!(summary["name"], json!("RewardsVault"));
        assert_eq!(summary["constructor"]["inputs"][0]["type"], json!("BigUint"));

        let balances = summary["endpoints"]
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["name"] == "getBalances")
            .unwrap();
        assert_eq!(
            balances["outputs"][0]["type"],
            json!("variadic<multi<TokenIdentifier,BigUint>>")
        );

        let deposit = summary["events"]
            .as_array()
            .unwrap()
            .iter()
            .find(|e| e["identifier"] == "deposit")
            .unwrap();
        assert_eq!(deposit["topics"].as_array().unwrap().len(), 2);
        assert_eq!(deposit["data"][0]["type"], json!("DepositEvent"));

        let action = summary["types"]
            .as_array()
            .unwrap()
            .iter()
            .find(|t| t["name"] == "Action")
            .unwrap();
        assert_eq!(action["kind"], json!("enum"));
        assert_eq!(action["variants"][2], json!({ "name": "Transfer", "discriminant": 5 }));
    }
}
