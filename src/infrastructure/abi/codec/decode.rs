//! Decoding: bytes + type descriptor -> typed value

use crate::domain::abi::{
    AbiError, AbiResult, Address, Decoded, EnumDefinition, EnumValue, FieldDefinition,
    FieldValue, StructDefinition, StructValue, TypeDescriptor, TypedValue, ADDRESS_LEN,
};

use super::numeric;
use super::BinaryCodec;

const LENGTH_PREFIX: usize = 4;

/// Per-call decoding state
pub(super) struct Decoder<'r> {
    codec: BinaryCodec<'r>,
    /// Length of the whole input; zero-sized items may not outnumber it
    input_len: usize,
    depth: usize,
    elements: usize,
}

impl<'r> Decoder<'r> {
    pub fn new(codec: BinaryCodec<'r>, input_len: usize) -> Self {
        Self {
            codec,
            input_len,
            depth: 0,
            elements: 0,
        }
    }

    pub fn top_level(&mut self, data: &[u8], ty: &TypeDescriptor) -> AbiResult<TypedValue> {
        let ty = self.codec.resolve(ty)?;
        self.count_elements(1)?;

        match ty.as_ref() {
            TypeDescriptor::Integer { signed, width } => {
                if let Some(len) = width.byte_len() {
                    if data.len() > len {
                        return Err(AbiError::malformed(format!(
                            "{} bytes exceed the width of {ty}",
                            data.len()
                        )));
                    }
                }
                Ok(TypedValue::Integer(numeric::from_bytes(data, *signed)))
            }
            TypeDescriptor::Bool => match data {
                [] => Ok(TypedValue::Bool(false)),
                [byte] => Ok(TypedValue::Bool(*byte != 0)),
                _ => Err(AbiError::malformed(format!(
                    "bool takes at most one byte, got {}",
                    data.len()
                ))),
            },
            TypeDescriptor::TokenIdentifier => {
                Ok(TypedValue::TokenIdentifier(utf8(data, "token identifier")?))
            }
            TypeDescriptor::Utf8String => Ok(TypedValue::Text(utf8(data, "string")?)),
            TypeDescriptor::Bytes => Ok(TypedValue::Bytes(data.to_vec())),
            TypeDescriptor::List(item) | TypeDescriptor::Variadic(item) => {
                self.with_depth(|decoder| decoder.until_exhausted(data, item))
            }
            TypeDescriptor::OptionalValue(inner) => {
                if data.is_empty() {
                    Ok(TypedValue::Option(None))
                } else {
                    let value = self.with_depth(|decoder| decoder.top_level(data, inner))?;
                    Ok(TypedValue::some(value))
                }
            }
            TypeDescriptor::Option(_) if data.is_empty() => Ok(TypedValue::Option(None)),
            TypeDescriptor::Enum(def) if data.is_empty() => unit_variant_zero(def),
            other => {
                let Decoded { value, bytes_read } = self.nested_resolved(data, other)?;
                if bytes_read != data.len() {
                    return Err(AbiError::malformed(format!(
                        "{} trailing bytes after top-level {other}",
                        data.len() - bytes_read
                    )));
                }
                Ok(value)
            }
        }
    }

    pub fn nested(&mut self, data: &[u8], ty: &TypeDescriptor) -> AbiResult<Decoded> {
        let ty = self.codec.resolve(ty)?;
        self.count_elements(1)?;
        self.nested_resolved(data, ty.as_ref())
    }

    fn nested_resolved(&mut self, data: &[u8], ty: &TypeDescriptor) -> AbiResult<Decoded> {
        match ty {
            TypeDescriptor::Integer { signed, width } => {
                let (bytes, bytes_read) = match width.byte_len() {
                    Some(len) => (take(data, 0, len, ty)?, len),
                    None => {
                        let len = read_length(data, 0, ty)?;
                        (take(data, LENGTH_PREFIX, len, ty)?, LENGTH_PREFIX + len)
                    }
                };
                Ok(decoded(
                    TypedValue::Integer(numeric::from_bytes(bytes, *signed)),
                    bytes_read,
                ))
            }
            TypeDescriptor::Bool => {
                let byte = take(data, 0, 1, ty)?[0];
                Ok(decoded(TypedValue::Bool(byte != 0), 1))
            }
            TypeDescriptor::Address => {
                let bytes = take(data, 0, ADDRESS_LEN, ty)?;
                let address = Address::from_slice(bytes)
                    .map_err(|e| AbiError::malformed(e.to_string()))?;
                Ok(decoded(TypedValue::Address(address), ADDRESS_LEN))
            }
            TypeDescriptor::H256 => {
                let mut hash = [0u8; 32];
                hash.copy_from_slice(take(data, 0, 32, ty)?);
                Ok(decoded(TypedValue::H256(hash), 32))
            }
            TypeDescriptor::CodeMetadata => {
                let mut flags = [0u8; 2];
                flags.copy_from_slice(take(data, 0, 2, ty)?);
                Ok(decoded(TypedValue::CodeMetadata(flags), 2))
            }
            TypeDescriptor::Nothing => Ok(decoded(TypedValue::Nothing, 0)),
            TypeDescriptor::TokenIdentifier
            | TypeDescriptor::Utf8String
            | TypeDescriptor::Bytes => {
                let len = read_length(data, 0, ty)?;
                let bytes = take(data, LENGTH_PREFIX, len, ty)?;
                let value = match ty {
                    TypeDescriptor::TokenIdentifier => {
                        TypedValue::TokenIdentifier(utf8(bytes, "token identifier")?)
                    }
                    TypeDescriptor::Utf8String => TypedValue::Text(utf8(bytes, "string")?),
                    _ => TypedValue::Bytes(bytes.to_vec()),
                };
                Ok(decoded(value, LENGTH_PREFIX + len))
            }
            TypeDescriptor::List(item) | TypeDescriptor::CountedVariadic(item) => {
                let count = read_length(data, 0, ty)?;
                self.with_depth(|decoder| decoder.repeated(data, LENGTH_PREFIX, item, count, true))
            }
            TypeDescriptor::Array(len, item) => {
                self.with_depth(|decoder| decoder.repeated(data, 0, item, *len, false))
            }
            TypeDescriptor::Option(inner) => match take(data, 0, 1, ty)?[0] {
                0x00 => Ok(decoded(TypedValue::Option(None), 1)),
                0x01 => {
                    let inner = self.with_depth(|decoder| decoder.nested(&data[1..], inner))?;
                    Ok(decoded(TypedValue::some(inner.value), 1 + inner.bytes_read))
                }
                tag => Err(AbiError::malformed(format!("invalid option tag 0x{tag:02x}"))),
            },
            TypeDescriptor::Struct(def) => self.with_depth(|decoder| decoder.structure(data, def)),
            TypeDescriptor::Enum(def) => self.with_depth(|decoder| decoder.enumeration(data, def)),
            TypeDescriptor::Tuple(items) | TypeDescriptor::Composite(items) => {
                self.with_depth(|decoder| {
                    let (values, bytes_read) = decoder.sequence(data, 0, items.iter())?;
                    Ok(decoded(TypedValue::Tuple(values), bytes_read))
                })
            }
            TypeDescriptor::Variadic(_) | TypeDescriptor::OptionalValue(_) => Err(
                AbiError::invalid_usage(format!("{ty} cannot be decoded in a nested position")),
            ),
            TypeDescriptor::Custom(_) => {
                let resolved = self.codec.resolve(ty)?;
                self.nested_resolved(data, resolved.as_ref())
            }
        }
    }

    fn structure(&mut self, data: &[u8], def: &StructDefinition) -> AbiResult<Decoded> {
        let (fields, bytes_read) = self.fields(data, 0, &def.fields)?;
        Ok(decoded(
            TypedValue::Struct(StructValue {
                name: def.name.clone(),
                fields,
            }),
            bytes_read,
        ))
    }

    fn enumeration(&mut self, data: &[u8], def: &EnumDefinition) -> AbiResult<Decoded> {
        let discriminant = *data
            .first()
            .ok_or_else(|| AbiError::malformed(format!("missing discriminant of {}", def.name)))?;
        let variant = def.variant_by_discriminant(discriminant).ok_or_else(|| {
            AbiError::malformed(format!(
                "invalid discriminant {discriminant} for enum {}",
                def.name
            ))
        })?;
        let (fields, bytes_read) = self.fields(data, 1, &variant.fields)?;
        Ok(decoded(
            TypedValue::Enum(EnumValue {
                name: variant.name.clone(),
                discriminant,
                fields,
            }),
            bytes_read,
        ))
    }

    fn fields(
        &mut self,
        data: &[u8],
        start: usize,
        defs: &[FieldDefinition],
    ) -> AbiResult<(Vec<FieldValue>, usize)> {
        let (values, end) = self.sequence(data, start, defs.iter().map(|def| &def.ty))?;
        let fields = defs
            .iter()
            .zip(values)
            .map(|(def, value)| FieldValue::new(&def.name, value))
            .collect();
        Ok((fields, end))
    }

    /// Decode `types` back to back starting at `start`; returns the end offset
    fn sequence<'t>(
        &mut self,
        data: &[u8],
        start: usize,
        types: impl Iterator<Item = &'t TypeDescriptor>,
    ) -> AbiResult<(Vec<TypedValue>, usize)> {
        let mut offset = start;
        let mut values = Vec::new();
        for ty in types {
            let Decoded { value, bytes_read } = self.nested(rest(data, offset)?, ty)?;
            offset += bytes_read;
            values.push(value);
        }
        Ok((values, offset))
    }

    /// `count` items from `start`; a `counted` length comes from the payload itself
    fn repeated(
        &mut self,
        data: &[u8],
        start: usize,
        item: &TypeDescriptor,
        count: usize,
        counted: bool,
    ) -> AbiResult<Decoded> {
        // reject absurd counts before looping; items are counted as they are read
        if self.elements.saturating_add(count) > self.codec.config.max_elements {
            return Err(AbiError::malformed(format!(
                "{count} items exceed the element limit ({})",
                self.codec.config.max_elements
            )));
        }
        let mut offset = start;
        let mut items = Vec::with_capacity(count.min(data.len()));
        for _ in 0..count {
            let Decoded { value, bytes_read } = self.nested(rest(data, offset)?, item)?;
            if counted && bytes_read == 0 && count > self.input_len {
                return Err(AbiError::malformed(format!(
                    "{count} zero-sized {item} items in a {}-byte input",
                    self.input_len
                )));
            }
            offset += bytes_read;
            items.push(value);
        }
        Ok(decoded(TypedValue::List(items), offset))
    }

    fn until_exhausted(&mut self, data: &[u8], item: &TypeDescriptor) -> AbiResult<TypedValue> {
        let mut offset = 0;
        let mut items = Vec::new();
        while offset < data.len() {
            let Decoded { value, bytes_read } = self.nested(&data[offset..], item)?;
            if bytes_read == 0 {
                return Err(AbiError::malformed(format!(
                    "zero-sized {item} cannot be read until the buffer is exhausted"
                )));
            }
            offset += bytes_read;
            items.push(value);
        }
        Ok(TypedValue::List(items))
    }

    fn with_depth<T>(&mut self, f: impl FnOnce(&mut Self) -> AbiResult<T>) -> AbiResult<T> {
        self.depth += 1;
        if self.depth > self.codec.config.max_depth {
            self.depth -= 1;
            return Err(AbiError::malformed(format!(
                "nesting depth limit ({}) reached while decoding",
                self.codec.config.max_depth
            )));
        }
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn count_elements(&mut self, count: usize) -> AbiResult<()> {
        self.elements = self.elements.saturating_add(count);
        if self.elements > self.codec.config.max_elements {
            return Err(AbiError::malformed(format!(
                "element limit ({}) reached while decoding",
                self.codec.config.max_elements
            )));
        }
        Ok(())
    }
}

fn decoded(value: TypedValue, bytes_read: usize) -> Decoded {
    Decoded { value, bytes_read }
}

fn rest(data: &[u8], offset: usize) -> AbiResult<&[u8]> {
    data.get(offset..)
        .ok_or_else(|| AbiError::malformed(format!("offset {offset} beyond {} bytes", data.len())))
}

/// `len` bytes at `offset`, or a typed error when the buffer is short
fn take<'d>(data: &'d [u8], offset: usize, len: usize, ty: &TypeDescriptor) -> AbiResult<&'d [u8]> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or_else(|| {
            AbiError::malformed(format!(
                "{ty} needs {len} bytes at offset {offset}, only {} available",
                data.len().saturating_sub(offset)
            ))
        })
}

fn read_length(data: &[u8], offset: usize, ty: &TypeDescriptor) -> AbiResult<usize> {
    let bytes = take(data, offset, LENGTH_PREFIX, ty)?;
    let len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    Ok(len as usize)
}

fn utf8(bytes: &[u8], what: &str) -> AbiResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| AbiError::malformed(format!("{what} is not valid UTF-8: {e}")))
}

/// Contracts return an empty buffer for a field-less variant 0 at top level
fn unit_variant_zero(def: &EnumDefinition) -> AbiResult<TypedValue> {
    match def.variant_by_discriminant(0) {
        Some(variant) if variant.fields.is_empty() => {
            Ok(TypedValue::variant(&variant.name, 0, Vec::new()))
        }
        _ => Err(AbiError::malformed(format!(
            "empty buffer is not a valid {}",
            def.name
        ))),
    }
}
