//! Serde model of the JSON ABI document

use serde::Deserialize;

/// Top-level ABI document as emitted by the contract build tooling
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbiDocument {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub constructor: Option<RawEndpoint>,
    #[serde(default)]
    pub upgrade_constructor: Option<RawEndpoint>,
    #[serde(default)]
    pub endpoints: Vec<RawEndpoint>,
    #[serde(default)]
    pub events: Vec<RawEvent>,
    /// Kept as a JSON map so declaration order survives
    #[serde(default)]
    pub types: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEndpoint {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mutability: Option<String>,
    #[serde(default)]
    pub inputs: Vec<RawParam>,
    #[serde(default)]
    pub outputs: Vec<RawParam>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default)]
    pub indexed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    pub identifier: String,
    #[serde(default)]
    pub inputs: Vec<RawParam>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTypeDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub fields: Vec<RawParam>,
    #[serde(default)]
    pub variants: Vec<RawVariant>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawVariant {
    pub name: String,
    #[serde(default)]
    pub discriminant: Option<u64>,
    #[serde(default)]
    pub fields: Vec<RawParam>,
}
