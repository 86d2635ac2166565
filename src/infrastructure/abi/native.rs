//! Native (JSON) values to typed values, and endpoint arguments to call data

use num_bigint::{BigInt, Sign};
use serde_json::Value;

use crate::domain::abi::{
    AbiCodec, AbiError, AbiRegistry, AbiResult, Address, EndpointDefinition, EnumDefinition,
    FieldValue, StructDefinition, TypeDescriptor, TypedValue,
};

use super::codec::{numeric, BinaryCodec};

/// Convert a JSON value into a typed value of `ty`
///
/// Accepts the shapes the decoder renders, so decoded output can be fed
/// back in unchanged.
pub fn native_to_typed(
    value: &Value,
    ty: &TypeDescriptor,
    registry: &AbiRegistry,
) -> AbiResult<TypedValue> {
    match ty {
        TypeDescriptor::Integer { signed, width } => {
            let number = parse_integer(value)?;
            numeric::check_range(&number, *signed, *width)?;
            Ok(TypedValue::Integer(number))
        }
        TypeDescriptor::Bool => match value {
            Value::Bool(flag) => Ok(TypedValue::Bool(*flag)),
            other => Err(mismatch(other, ty)),
        },
        TypeDescriptor::Address => Ok(TypedValue::Address(Address::parse(as_str(value, ty)?)?)),
        TypeDescriptor::H256 => {
            let bytes = parse_hex(as_str(value, ty)?)?;
            let hash: [u8; 32] = bytes
                .try_into()
                .map_err(|_| AbiError::invalid_value("H256 needs 32 bytes"))?;
            Ok(TypedValue::H256(hash))
        }
        TypeDescriptor::CodeMetadata => {
            let bytes = parse_hex(as_str(value, ty)?)?;
            let flags: [u8; 2] = bytes
                .try_into()
                .map_err(|_| AbiError::invalid_value("CodeMetadata needs 2 bytes"))?;
            Ok(TypedValue::CodeMetadata(flags))
        }
        TypeDescriptor::Nothing => match value {
            Value::Null => Ok(TypedValue::Nothing),
            other => Err(mismatch(other, ty)),
        },
        TypeDescriptor::TokenIdentifier => {
            Ok(TypedValue::TokenIdentifier(as_str(value, ty)?.to_string()))
        }
        TypeDescriptor::Utf8String => Ok(TypedValue::Text(as_str(value, ty)?.to_string())),
        TypeDescriptor::Bytes => Ok(TypedValue::Bytes(parse_hex(as_str(value, ty)?)?)),
        TypeDescriptor::List(item)
        | TypeDescriptor::Variadic(item)
        | TypeDescriptor::CountedVariadic(item) => as_array(value, ty)?
            .iter()
            .map(|item_value| native_to_typed(item_value, item, registry))
            .collect::<AbiResult<Vec<_>>>()
            .map(TypedValue::List),
        TypeDescriptor::Array(len, item) => {
            let items = as_array(value, ty)?;
            if items.len() != *len {
                return Err(AbiError::invalid_value(format!(
                    "{ty} needs {len} items, got {}",
                    items.len()
                )));
            }
            items
                .iter()
                .map(|item_value| native_to_typed(item_value, item, registry))
                .collect::<AbiResult<Vec<_>>>()
                .map(TypedValue::List)
        }
        TypeDescriptor::Option(inner) | TypeDescriptor::OptionalValue(inner) => match value {
            Value::Null => Ok(TypedValue::none()),
            other => Ok(TypedValue::some(native_to_typed(other, inner, registry)?)),
        },
        TypeDescriptor::Tuple(types) | TypeDescriptor::Composite(types) => {
            let items = as_array(value, ty)?;
            if items.len() != types.len() {
                return Err(AbiError::invalid_value(format!(
                    "{ty} has {} components, got {}",
                    types.len(),
                    items.len()
                )));
            }
            items
                .iter()
                .zip(types)
                .map(|(item_value, item_ty)| native_to_typed(item_value, item_ty, registry))
                .collect::<AbiResult<Vec<_>>>()
                .map(TypedValue::Tuple)
        }
        TypeDescriptor::Struct(def) => struct_value(value, def, registry),
        TypeDescriptor::Enum(def) => enum_value(value, def, registry),
        TypeDescriptor::Custom(name) => {
            let resolved = registry.get_custom_type(name)?.descriptor();
            native_to_typed(value, &resolved, registry)
        }
    }
}

/// Convert a JSON argument list for `endpoint`
///
/// Trailing `optional`/`variadic` inputs may be left out.
pub fn native_arguments(
    values: &[Value],
    endpoint: &EndpointDefinition,
    registry: &AbiRegistry,
) -> AbiResult<Vec<TypedValue>> {
    if values.len() > endpoint.inputs.len() {
        return Err(AbiError::ResultArity(format!(
            "'{}' takes {} arguments, got {}",
            endpoint.name,
            endpoint.inputs.len(),
            values.len()
        )));
    }
    endpoint
        .inputs
        .iter()
        .enumerate()
        .map(|(index, input)| match values.get(index) {
            Some(value) => native_to_typed(value, &input.ty, registry),
            None => omitted_argument(&input.ty).ok_or_else(|| {
                AbiError::ResultArity(format!(
                    "'{}' is missing argument '{}'",
                    endpoint.name, input.name
                ))
            }),
        })
        .collect()
}

/// Encode arguments into one top-level buffer per raw argument
///
/// Multi-value inputs expand to as many buffers as they hold values.
pub fn encode_arguments(
    codec: &BinaryCodec<'_>,
    inputs: &[TypeDescriptor],
    values: &[TypedValue],
) -> AbiResult<Vec<Vec<u8>>> {
    if values.len() > inputs.len() {
        return Err(AbiError::ResultArity(format!(
            "expected at most {} arguments, got {}",
            inputs.len(),
            values.len()
        )));
    }

    let mut buffers = Vec::new();
    for (index, ty) in inputs.iter().enumerate() {
        match values.get(index) {
            Some(value) => encode_argument(codec, ty, value, &mut buffers)?,
            None if omitted_argument(ty).is_some() => {}
            None => {
                return Err(AbiError::ResultArity(format!(
                    "missing argument #{index} of type {ty}"
                )))
            }
        }
    }
    Ok(buffers)
}

/// `endpoint@hex@hex...`
pub fn build_call_data(
    codec: &BinaryCodec<'_>,
    endpoint: &EndpointDefinition,
    values: &[TypedValue],
) -> AbiResult<String> {
    let buffers = encode_arguments(codec, &endpoint.input_types(), values)?;
    let mut data = endpoint.name.clone();
    for buffer in &buffers {
        data.push('@');
        data.push_str(&hex::encode(buffer));
    }
    Ok(data)
}

fn encode_argument(
    codec: &BinaryCodec<'_>,
    ty: &TypeDescriptor,
    value: &TypedValue,
    buffers: &mut Vec<Vec<u8>>,
) -> AbiResult<()> {
    match (ty, value) {
        (TypeDescriptor::Variadic(item), TypedValue::List(items)) => items
            .iter()
            .try_for_each(|value| encode_item(codec, item, value, buffers)),
        (TypeDescriptor::CountedVariadic(item), TypedValue::List(items)) => {
            let count = TypedValue::integer(items.len());
            buffers.push(codec.encode_top_level(&count, &TypeDescriptor::u32())?);
            items
                .iter()
                .try_for_each(|value| encode_item(codec, item, value, buffers))
        }
        (TypeDescriptor::OptionalValue(inner), TypedValue::Option(option)) => match option {
            None => Ok(()),
            Some(value) => encode_item(codec, inner, value, buffers),
        },
        (
            TypeDescriptor::Variadic(_)
            | TypeDescriptor::CountedVariadic(_)
            | TypeDescriptor::OptionalValue(_),
            other,
        ) => Err(AbiError::invalid_value(format!(
            "cannot pass {} as {ty}",
            other.kind()
        ))),
        _ => encode_item(codec, ty, value, buffers),
    }
}

fn encode_item(
    codec: &BinaryCodec<'_>,
    ty: &TypeDescriptor,
    value: &TypedValue,
    buffers: &mut Vec<Vec<u8>>,
) -> AbiResult<()> {
    match (ty, value) {
        (TypeDescriptor::Composite(types), TypedValue::Tuple(items)) => {
            if types.len() != items.len() {
                return Err(AbiError::invalid_value(format!(
                    "{ty} has {} components, got {}",
                    types.len(),
                    items.len()
                )));
            }
            for (item_ty, item) in types.iter().zip(items) {
                buffers.push(codec.encode_top_level(item, item_ty)?);
            }
            Ok(())
        }
        _ => {
            buffers.push(codec.encode_top_level(value, ty)?);
            Ok(())
        }
    }
}

/// Value standing in for an argument that was left out
fn omitted_argument(ty: &TypeDescriptor) -> Option<TypedValue> {
    match ty {
        TypeDescriptor::OptionalValue(_) => Some(TypedValue::none()),
        TypeDescriptor::Variadic(_) => Some(TypedValue::List(Vec::new())),
        _ => None,
    }
}

fn struct_value(
    value: &Value,
    def: &StructDefinition,
    registry: &AbiRegistry,
) -> AbiResult<TypedValue> {
    let Value::Object(map) = value else {
        return Err(AbiError::invalid_value(format!(
            "struct {} needs a JSON object",
            def.name
        )));
    };
    if let Some(extra) = map.keys().find(|key| !def.fields.iter().any(|f| &f.name == *key)) {
        return Err(AbiError::invalid_value(format!(
            "struct {} has no field '{extra}'",
            def.name
        )));
    }
    let fields = def
        .fields
        .iter()
        .map(|field| {
            let value = match (map.get(&field.name), &field.ty) {
                (Some(value), ty) => native_to_typed(value, ty, registry)?,
                (None, TypeDescriptor::Option(_)) => TypedValue::none(),
                (None, _) => {
                    return Err(AbiError::invalid_value(format!(
                        "struct {} is missing field '{}'",
                        def.name, field.name
                    )))
                }
            };
            Ok(FieldValue::new(&field.name, value))
        })
        .collect::<AbiResult<Vec<_>>>()?;
    Ok(TypedValue::structure(&def.name, fields))
}

/// `"Name"`, a discriminant number, or `{"name": ..., "fields": {...}}`
fn enum_value(
    value: &Value,
    def: &EnumDefinition,
    registry: &AbiRegistry,
) -> AbiResult<TypedValue> {
    let (variant, fields) = match value {
        Value::String(name) => (def.variant_by_name(name), None),
        Value::Number(number) => {
            let discriminant = number
                .as_u64()
                .and_then(|n| u8::try_from(n).ok())
                .ok_or_else(|| AbiError::invalid_value(format!("bad discriminant {number}")))?;
            (def.variant_by_discriminant(discriminant), None)
        }
        Value::Object(map) => {
            let name = map
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    AbiError::invalid_value(format!("enum {} object needs a 'name'", def.name))
                })?;
            (def.variant_by_name(name), map.get("fields"))
        }
        other => {
            return Err(AbiError::invalid_value(format!(
                "cannot convert {other} to enum {}",
                def.name
            )))
        }
    };
    let variant = variant.ok_or_else(|| {
        AbiError::invalid_value(format!("enum {} has no variant {value}", def.name))
    })?;

    let empty = Value::Object(Default::default());
    let payload = StructDefinition::new(&variant.name, variant.fields.clone());
    let TypedValue::Struct(converted) = struct_value(fields.unwrap_or(&empty), &payload, registry)?
    else {
        return Err(AbiError::invalid_value(format!(
            "bad fields for {}::{}",
            def.name, variant.name
        )));
    };
    Ok(TypedValue::variant(
        &variant.name,
        variant.discriminant,
        converted.fields,
    ))
}

fn parse_integer(value: &Value) -> AbiResult<BigInt> {
    let text = match value {
        Value::Number(number) => number.to_string(),
        Value::String(text) => text.trim().to_string(),
        other => {
            return Err(AbiError::invalid_value(format!(
                "cannot convert {other} to an integer"
            )))
        }
    };
    let parsed = match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex_digits) => hex::decode(pad_hex(hex_digits))
            .ok()
            .map(|bytes| BigInt::from_bytes_be(Sign::Plus, &bytes)),
        None => text.parse::<BigInt>().ok(),
    };
    parsed.ok_or_else(|| AbiError::invalid_value(format!("'{text}' is not an integer")))
}

fn pad_hex(digits: &str) -> String {
    if digits.len() % 2 == 1 {
        format!("0{digits}")
    } else {
        digits.to_string()
    }
}

fn parse_hex(text: &str) -> AbiResult<Vec<u8>> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    hex::decode(digits).map_err(|e| AbiError::invalid_value(format!("bad hex '{text}': {e}")))
}

fn as_str<'v>(value: &'v Value, ty: &TypeDescriptor) -> AbiResult<&'v str> {
    value.as_str().ok_or_else(|| mismatch(value, ty))
}

fn as_array<'v>(value: &'v Value, ty: &TypeDescriptor) -> AbiResult<&'v Vec<Value>> {
    value.as_array().ok_or_else(|| mismatch(value, ty))
}

fn mismatch(value: &Value, ty: &TypeDescriptor) -> AbiError {
    AbiError::invalid_value(format!("cannot convert {value} to {ty}"))
}
