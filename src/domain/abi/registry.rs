//! ABI registry - custom types, endpoints and events of one contract

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;

use super::document::{AbiDocument, RawEndpoint, RawParam, RawTypeDefinition};
use super::error::{AbiError, AbiResult};
use super::parser::{parse_type, CustomTypeLookup};
use super::types::{
    CustomType, EnumDefinition, EnumVariantDefinition, FieldDefinition, StructDefinition,
    TypeDescriptor,
};

/// A positional parameter of an endpoint (input or output)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamSpec {
    /// Parameter name (may be empty for outputs)
    pub name: String,
    pub ty: TypeDescriptor,
}

/// An endpoint (or constructor) signature
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointDefinition {
    pub name: String,
    pub mutability: Option<String>,
    pub inputs: Vec<ParamSpec>,
    pub outputs: Vec<ParamSpec>,
}

impl EndpointDefinition {
    /// Argument types in declaration order
    pub fn input_types(&self) -> Vec<TypeDescriptor> {
        self.inputs.iter().map(|param| param.ty.clone()).collect()
    }

    /// Output types in declaration order
    pub fn output_types(&self) -> Vec<TypeDescriptor> {
        self.outputs.iter().map(|param| param.ty.clone()).collect()
    }
}

/// An event input; indexed inputs travel as topics, the rest as data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventInput {
    pub name: String,
    pub ty: TypeDescriptor,
    pub indexed: bool,
}

/// An event signature, keyed by its identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDefinition {
    pub identifier: String,
    pub inputs: Vec<EventInput>,
}

impl EventDefinition {
    /// Indexed inputs, in topic order
    pub fn topics(&self) -> impl Iterator<Item = &EventInput> {
        self.inputs.iter().filter(|input| input.indexed)
    }

    /// Non-indexed inputs, carried in the log data
    pub fn data(&self) -> impl Iterator<Item = &EventInput> {
        self.inputs.iter().filter(|input| !input.indexed)
    }
}

/// Immutable view of a contract ABI
///
/// Built once with [`AbiRegistry::create`] and shared by reference; every
/// custom-type reference inside it is guaranteed to resolve.
#[derive(Debug, Clone, Default)]
pub struct AbiRegistry {
    pub name: Option<String>,
    pub constructor: Option<EndpointDefinition>,
    endpoints: Vec<EndpointDefinition>,
    events: Vec<EventDefinition>,
    custom_types: Vec<CustomType>,
    type_index: HashMap<String, usize>,
}

impl AbiRegistry {
    /// Build a registry from a parsed JSON ABI document
    pub fn create(json: &serde_json::Value) -> AbiResult<Self> {
        let document = AbiDocument::deserialize(json)
            .map_err(|e| AbiError::InvalidAbi(e.to_string()))?;
        Self::from_document(document)
    }

    /// Parse ABI JSON text and build the registry.
    ///
    /// Malformed JSON is reported as [`AbiError::InvalidAbi`].
    pub fn from_json_str(content: &str) -> AbiResult<Self> {
        let json: serde_json::Value =
            serde_json::from_str(content).map_err(|e| AbiError::InvalidAbi(e.to_string()))?;
        Self::create(&json)
    }

    /// Build from an already deserialized document.
    ///
    /// Every type name must resolve against the document's own types;
    /// endpoint and event signatures are checked for misplaced
    /// top-level-only types.
    pub fn from_document(document: AbiDocument) -> AbiResult<Self> {
        // First pass: every custom-type name, so bodies may reference each other
        let names: HashSet<String> = document.types.keys().cloned().collect();

        let mut custom_types = Vec::with_capacity(document.types.len());
        let mut type_index = HashMap::with_capacity(document.types.len());
        for (name, raw) in &document.types {
            let raw = RawTypeDefinition::deserialize(raw)
                .map_err(|e| AbiError::InvalidAbi(format!("type '{name}': {e}")))?;
            let custom = build_custom_type(name, &raw, &names)?;
            type_index.insert(name.clone(), custom_types.len());
            custom_types.push(custom);
        }

        let constructor = document
            .constructor
            .as_ref()
            .or(document.upgrade_constructor.as_ref())
            .map(|raw| build_endpoint(raw, "constructor", &names))
            .transpose()?;

        let endpoints = document
            .endpoints
            .iter()
            .map(|raw| build_endpoint(raw, &raw.name, &names))
            .collect::<AbiResult<Vec<_>>>()?;

        let mut events = Vec::with_capacity(document.events.len());
        for raw in &document.events {
            let inputs = raw
                .inputs
                .iter()
                .map(|param| {
                    Ok(EventInput {
                        name: param.name.clone(),
                        ty: parse_type(&param.ty, &names)?,
                        indexed: param.indexed,
                    })
                })
                .collect::<AbiResult<Vec<_>>>()?;
            let data_types: Vec<&TypeDescriptor> = inputs
                .iter()
                .filter(|input| !input.indexed)
                .map(|input| &input.ty)
                .collect();
            validate_top_level(&data_types, &format!("event '{}'", raw.identifier))?;
            for topic in inputs.iter().filter(|input| input.indexed) {
                validate_top_level(&[&topic.ty], &format!("event '{}'", raw.identifier))?;
            }
            events.push(EventDefinition {
                identifier: raw.identifier.clone(),
                inputs,
            });
        }

        tracing::debug!(
            name = document.name.as_deref().unwrap_or("<unnamed>"),
            types = custom_types.len(),
            endpoints = endpoints.len(),
            events = events.len(),
            "ABI registry created"
        );

        Ok(Self {
            name: document.name,
            constructor,
            endpoints,
            events,
            custom_types,
            type_index,
        })
    }

    /// Parse a type name against this registry's custom types
    pub fn parse_type(&self, name: &str) -> AbiResult<TypeDescriptor> {
        parse_type(name, self)
    }

    /// Resolve a custom type by name without failing
    pub fn custom_type(&self, name: &str) -> Option<&CustomType> {
        self.type_index
            .get(name)
            .and_then(|index| self.custom_types.get(*index))
    }

    /// Like [`AbiRegistry::custom_type`], failing with `NotFound`
    pub fn get_custom_type(&self, name: &str) -> AbiResult<&CustomType> {
        self.custom_type(name)
            .ok_or_else(|| AbiError::not_found("custom type", name))
    }

    /// Struct definition by name; an enum of that name is `NotFound` too
    pub fn get_struct(&self, name: &str) -> AbiResult<Arc<StructDefinition>> {
        match self.custom_type(name) {
            Some(CustomType::Struct(def)) => Ok(Arc::clone(def)),
            _ => Err(AbiError::not_found("struct", name)),
        }
    }

    /// Enum definition by name
    pub fn get_enum(&self, name: &str) -> AbiResult<Arc<EnumDefinition>> {
        match self.custom_type(name) {
            Some(CustomType::Enum(def)) => Ok(Arc::clone(def)),
            _ => Err(AbiError::not_found("enum", name)),
        }
    }

    /// Endpoint by exact name; the constructor is not listed here
    pub fn get_endpoint(&self, name: &str) -> AbiResult<&EndpointDefinition> {
        self.endpoints
            .iter()
            .find(|endpoint| endpoint.name == name)
            .ok_or_else(|| AbiError::not_found("endpoint", name))
    }

    /// Event by identifier
    pub fn get_event(&self, identifier: &str) -> AbiResult<&EventDefinition> {
        self.events
            .iter()
            .find(|event| event.identifier == identifier)
            .ok_or_else(|| AbiError::not_found("event", identifier))
    }

    /// Custom types in declaration order
    pub fn custom_types(&self) -> impl Iterator<Item = &CustomType> {
        self.custom_types.iter()
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointDefinition> {
        self.endpoints.iter()
    }

    pub fn events(&self) -> impl Iterator<Item = &EventDefinition> {
        self.events.iter()
    }
}

impl CustomTypeLookup for AbiRegistry {
    fn has_custom_type(&self, name: &str) -> bool {
        self.type_index.contains_key(name)
    }
}

fn build_custom_type(
    name: &str,
    raw: &RawTypeDefinition,
    names: &HashSet<String>,
) -> AbiResult<CustomType> {
    match raw.kind.as_str() {
        "struct" => {
            let fields = build_fields(&raw.fields, name, names)?;
            Ok(CustomType::Struct(Arc::new(StructDefinition::new(name, fields))))
        }
        "enum" => {
            let mut seen = HashSet::new();
            let mut variants = Vec::with_capacity(raw.variants.len());
            for (position, variant) in raw.variants.iter().enumerate() {
                let value = variant.discriminant.unwrap_or(position as u64);
                let discriminant = u8::try_from(value).map_err(|_| {
                    AbiError::invalid_usage(format!(
                        "enum '{name}' variant '{}' has discriminant {value} outside 0..=255",
                        variant.name
                    ))
                })?;
                if !seen.insert(discriminant) {
                    return Err(AbiError::invalid_usage(format!(
                        "enum '{name}' has duplicate discriminant {discriminant}"
                    )));
                }
                let context = format!("{name}::{}", variant.name);
                let fields = build_fields(&variant.fields, &context, names)?;
                variants.push(EnumVariantDefinition::new(&variant.name, discriminant, fields));
            }
            Ok(CustomType::Enum(Arc::new(EnumDefinition::new(name, variants))))
        }
        other => Err(AbiError::InvalidAbi(format!(
            "type '{name}' has unsupported kind '{other}'"
        ))),
    }
}

fn build_fields(
    raw: &[RawParam],
    context: &str,
    names: &HashSet<String>,
) -> AbiResult<Vec<FieldDefinition>> {
    raw.iter()
        .map(|field| {
            let ty = parse_type(&field.ty, names)?;
            validate_nested(&ty, context)?;
            Ok(FieldDefinition::new(&field.name, ty))
        })
        .collect()
}

fn build_endpoint(
    raw: &RawEndpoint,
    name: &str,
    names: &HashSet<String>,
) -> AbiResult<EndpointDefinition> {
    let parse_params = |params: &[RawParam], side: &str| -> AbiResult<Vec<ParamSpec>> {
        let specs = params
            .iter()
            .map(|param| {
                Ok(ParamSpec {
                    name: param.name.clone(),
                    ty: parse_type(&param.ty, names)?,
                })
            })
            .collect::<AbiResult<Vec<_>>>()?;
        let types: Vec<&TypeDescriptor> = specs.iter().map(|spec| &spec.ty).collect();
        validate_top_level(&types, &format!("{side} of '{name}'"))?;
        Ok(specs)
    };

    Ok(EndpointDefinition {
        name: name.to_string(),
        mutability: raw.mutability.clone(),
        inputs: parse_params(&raw.inputs, "inputs")?,
        outputs: parse_params(&raw.outputs, "outputs")?,
    })
}

/// Checks a positional argument/output list.
///
/// `variadic` must be last, `optional` may only be followed by other
/// multi-value tails, `multi` stays at this level.
pub fn validate_top_level(types: &[&TypeDescriptor], context: &str) -> AbiResult<()> {
    for (position, ty) in types.iter().enumerate() {
        let rest = &types[position + 1..];
        match ty {
            TypeDescriptor::Variadic(inner) => {
                if !rest.is_empty() {
                    return Err(AbiError::invalid_usage(format!(
                        "{ty} must be the last parameter in {context}"
                    )));
                }
                validate_multi_item(inner, context)?;
            }
            TypeDescriptor::OptionalValue(inner) => {
                let tail_ok = rest.iter().all(|next| {
                    matches!(
                        next,
                        TypeDescriptor::OptionalValue(_) | TypeDescriptor::Variadic(_)
                    )
                });
                if !tail_ok {
                    return Err(AbiError::invalid_usage(format!(
                        "{ty} may only be followed by optional or variadic parameters in {context}"
                    )));
                }
                validate_multi_item(inner, context)?;
            }
            TypeDescriptor::CountedVariadic(inner) => validate_multi_item(inner, context)?,
            TypeDescriptor::Composite(items) => {
                for item in items {
                    validate_nested(item, context)?;
                }
            }
            other => validate_nested(other, context)?,
        }
    }
    Ok(())
}

fn validate_multi_item(ty: &TypeDescriptor, context: &str) -> AbiResult<()> {
    match ty {
        TypeDescriptor::Composite(items) => items
            .iter()
            .try_for_each(|item| validate_nested(item, context)),
        other => validate_nested(other, context),
    }
}

/// Rejects top-level-only types anywhere inside a nested position
pub fn validate_nested(ty: &TypeDescriptor, context: &str) -> AbiResult<()> {
    match ty {
        TypeDescriptor::Variadic(_)
        | TypeDescriptor::OptionalValue(_)
        | TypeDescriptor::Composite(_) => Err(AbiError::invalid_usage(format!(
            "{ty} cannot be nested (in {context})"
        ))),
        TypeDescriptor::CountedVariadic(inner) => validate_multi_item(inner, context),
        other => other
            .children()
            .into_iter()
            .try_for_each(|child| validate_nested(child, context)),
    }
}
