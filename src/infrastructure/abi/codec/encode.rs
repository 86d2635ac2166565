//! Encoding: typed value + type descriptor -> bytes

use num_bigint::BigInt;

use crate::domain::abi::{
    AbiError, AbiResult, EnumDefinition, EnumVariantDefinition, FieldDefinition, FieldValue,
    TypeDescriptor, TypedValue,
};

use super::numeric;
use super::BinaryCodec;

/// Per-call encoding state
pub(super) struct Encoder<'r> {
    codec: BinaryCodec<'r>,
    depth: usize,
}

impl<'r> Encoder<'r> {
    pub fn new(codec: BinaryCodec<'r>) -> Self {
        Self { codec, depth: 0 }
    }

    pub fn top_level(&mut self, value: &TypedValue, ty: &TypeDescriptor) -> AbiResult<Vec<u8>> {
        let ty = self.codec.resolve(ty)?;

        match (ty.as_ref(), value) {
            (TypeDescriptor::Integer { signed, width }, TypedValue::Integer(number)) => {
                numeric::check_range(number, *signed, *width)?;
                Ok(numeric::to_minimal_bytes(number, *signed))
            }
            (TypeDescriptor::Bool, TypedValue::Bool(flag)) => {
                Ok(if *flag { vec![0x01] } else { Vec::new() })
            }
            (
                TypeDescriptor::TokenIdentifier
                | TypeDescriptor::Utf8String
                | TypeDescriptor::Bytes,
                _,
            ) => Ok(string_like(value, ty.as_ref())?.to_vec()),
            (
                TypeDescriptor::List(item) | TypeDescriptor::Variadic(item),
                TypedValue::List(items),
            ) => {
                let mut out = Vec::new();
                self.with_depth(|encoder| {
                    items
                        .iter()
                        .try_for_each(|value| encoder.nested(value, item, &mut out))
                })?;
                Ok(out)
            }
            (TypeDescriptor::OptionalValue(inner), TypedValue::Option(option)) => match option {
                None => Ok(Vec::new()),
                Some(value) => self.with_depth(|encoder| encoder.top_level(value, inner)),
            },
            (TypeDescriptor::Option(_), TypedValue::Option(None)) => Ok(Vec::new()),
            (TypeDescriptor::Enum(def), TypedValue::Enum(variant)) if variant.fields.is_empty() => {
                let discriminant = unit_discriminant(def, &variant.name)?;
                Ok(numeric::to_minimal_bytes(&BigInt::from(discriminant), false))
            }
            (other, _) => {
                let mut out = Vec::new();
                self.nested_resolved(value, other, &mut out)?;
                Ok(out)
            }
        }
    }

    pub fn nested(
        &mut self,
        value: &TypedValue,
        ty: &TypeDescriptor,
        out: &mut Vec<u8>,
    ) -> AbiResult<()> {
        let ty = self.codec.resolve(ty)?;
        self.nested_resolved(value, ty.as_ref(), out)
    }

    fn nested_resolved(
        &mut self,
        value: &TypedValue,
        ty: &TypeDescriptor,
        out: &mut Vec<u8>,
    ) -> AbiResult<()> {
        match (ty, value) {
            (TypeDescriptor::Integer { signed, width }, TypedValue::Integer(number)) => {
                numeric::check_range(number, *signed, *width)?;
                match width.byte_len() {
                    Some(len) => out.extend(numeric::to_fixed_bytes(number, *signed, len)?),
                    None => write_prefixed(out, &numeric::to_minimal_bytes(number, *signed))?,
                }
            }
            (TypeDescriptor::Bool, TypedValue::Bool(flag)) => out.push(u8::from(*flag)),
            (TypeDescriptor::Address, TypedValue::Address(address)) => {
                out.extend_from_slice(address.as_bytes())
            }
            (TypeDescriptor::H256, _) => out.extend_from_slice(&fixed_bytes::<32>(value, ty)?),
            (TypeDescriptor::CodeMetadata, _) => {
                out.extend_from_slice(&fixed_bytes::<2>(value, ty)?)
            }
            (TypeDescriptor::Nothing, TypedValue::Nothing) => {}
            (
                TypeDescriptor::TokenIdentifier
                | TypeDescriptor::Utf8String
                | TypeDescriptor::Bytes,
                _,
            ) => write_prefixed(out, string_like(value, ty)?)?,
            (
                TypeDescriptor::List(item) | TypeDescriptor::CountedVariadic(item),
                TypedValue::List(items),
            ) => {
                write_length(out, items.len())?;
                self.with_depth(|encoder| {
                    items
                        .iter()
                        .try_for_each(|value| encoder.nested(value, item, out))
                })?;
            }
            (TypeDescriptor::Array(len, item), TypedValue::List(items)) => {
                if items.len() != *len {
                    return Err(AbiError::invalid_value(format!(
                        "{ty} needs {len} items, got {}",
                        items.len()
                    )));
                }
                self.with_depth(|encoder| {
                    items
                        .iter()
                        .try_for_each(|value| encoder.nested(value, item, out))
                })?;
            }
            (TypeDescriptor::Option(inner), TypedValue::Option(option)) => match option {
                None => out.push(0x00),
                Some(value) => {
                    out.push(0x01);
                    self.with_depth(|encoder| encoder.nested(value, inner, out))?;
                }
            },
            (TypeDescriptor::Struct(def), TypedValue::Struct(structure)) => {
                self.with_depth(|encoder| {
                    encoder.fields(&def.name, &def.fields, &structure.fields, out)
                })?;
            }
            (TypeDescriptor::Enum(def), TypedValue::Enum(variant)) => {
                let definition = variant_definition(def, &variant.name)?;
                out.push(definition.discriminant);
                self.with_depth(|encoder| {
                    encoder.fields(&definition.name, &definition.fields, &variant.fields, out)
                })?;
            }
            (
                TypeDescriptor::Tuple(types) | TypeDescriptor::Composite(types),
                TypedValue::Tuple(items),
            ) => {
                if items.len() != types.len() {
                    return Err(AbiError::invalid_value(format!(
                        "{ty} has {} components, got {}",
                        types.len(),
                        items.len()
                    )));
                }
                self.with_depth(|encoder| {
                    items
                        .iter()
                        .zip(types)
                        .try_for_each(|(value, ty)| encoder.nested(value, ty, out))
                })?;
            }
            (TypeDescriptor::Variadic(_) | TypeDescriptor::OptionalValue(_), _) => {
                return Err(AbiError::invalid_usage(format!(
                    "{ty} cannot be encoded in a nested position"
                )))
            }
            (TypeDescriptor::Custom(_), _) => {
                let resolved = self.codec.resolve(ty)?;
                self.nested_resolved(value, resolved.as_ref(), out)?;
            }
            _ => return Err(mismatch(value, ty)),
        }
        Ok(())
    }

    /// Fields are looked up by name and written in declaration order
    fn fields(
        &mut self,
        owner: &str,
        defs: &[FieldDefinition],
        values: &[FieldValue],
        out: &mut Vec<u8>,
    ) -> AbiResult<()> {
        if let Some(extra) = values
            .iter()
            .find(|value| !defs.iter().any(|def| def.name == value.name))
        {
            return Err(AbiError::invalid_value(format!(
                "{owner} has no field '{}'",
                extra.name
            )));
        }
        for def in defs {
            let value = values
                .iter()
                .find(|value| value.name == def.name)
                .ok_or_else(|| {
                    AbiError::invalid_value(format!("{owner} is missing field '{}'", def.name))
                })?;
            self.nested(&value.value, &def.ty, out)?;
        }
        Ok(())
    }

    fn with_depth<T>(&mut self, f: impl FnOnce(&mut Self) -> AbiResult<T>) -> AbiResult<T> {
        self.depth += 1;
        if self.depth > self.codec.config.max_depth {
            self.depth -= 1;
            return Err(AbiError::malformed(format!(
                "nesting depth limit ({}) reached while encoding",
                self.codec.config.max_depth
            )));
        }
        let result = f(self);
        self.depth -= 1;
        result
    }
}

fn mismatch(value: &TypedValue, ty: &TypeDescriptor) -> AbiError {
    AbiError::invalid_value(format!("cannot encode {} as {ty}", value.kind()))
}

fn string_like<'v>(value: &'v TypedValue, ty: &TypeDescriptor) -> AbiResult<&'v [u8]> {
    value.as_bytes().ok_or_else(|| mismatch(value, ty))
}

fn fixed_bytes<const N: usize>(value: &TypedValue, ty: &TypeDescriptor) -> AbiResult<[u8; N]> {
    let bytes: &[u8] = match value {
        TypedValue::H256(hash) => hash,
        TypedValue::CodeMetadata(flags) => flags,
        TypedValue::Bytes(bytes) => bytes,
        _ => return Err(mismatch(value, ty)),
    };
    bytes.try_into().map_err(|_| {
        AbiError::invalid_value(format!("{ty} needs {N} bytes, got {}", bytes.len()))
    })
}

fn write_length(out: &mut Vec<u8>, len: usize) -> AbiResult<()> {
    let len = u32::try_from(len)
        .map_err(|_| AbiError::invalid_value(format!("length {len} exceeds u32")))?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

fn write_prefixed(out: &mut Vec<u8>, bytes: &[u8]) -> AbiResult<()> {
    write_length(out, bytes.len())?;
    out.extend_from_slice(bytes);
    Ok(())
}

fn variant_definition<'d>(
    def: &'d EnumDefinition,
    name: &str,
) -> AbiResult<&'d EnumVariantDefinition> {
    def.variant_by_name(name).ok_or_else(|| {
        AbiError::invalid_value(format!("enum {} has no variant '{name}'", def.name))
    })
}

fn unit_discriminant(def: &EnumDefinition, name: &str) -> AbiResult<u8> {
    let variant = variant_definition(def, name)?;
    if !variant.fields.is_empty() {
        return Err(AbiError::invalid_value(format!(
            "variant {name} of {} expects {} fields",
            def.name,
            variant.fields.len()
        )));
    }
    Ok(variant.discriminant)
}
