//! Typed values produced by decoding and consumed by encoding

use std::fmt;

use bech32::{FromBase32, ToBase32, Variant};
use num_bigint::BigInt;
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use super::error::{AbiError, AbiResult};

/// Human-readable prefix of account addresses
pub const ADDRESS_HRP: &str = "erd";

/// Length of an account address in bytes
pub const ADDRESS_LEN: usize = 32;

/// A 32-byte account address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    pub fn from_slice(bytes: &[u8]) -> AbiResult<Self> {
        let array: [u8; ADDRESS_LEN] = bytes.try_into().map_err(|_| {
            AbiError::invalid_value(format!(
                "address must be {} bytes, got {}",
                ADDRESS_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    pub fn from_bech32(value: &str) -> AbiResult<Self> {
        let (hrp, data, _variant) = bech32::decode(value)
            .map_err(|e| AbiError::invalid_value(format!("bad bech32 address '{value}': {e}")))?;
        if hrp != ADDRESS_HRP {
            return Err(AbiError::invalid_value(format!(
                "address '{value}' has prefix '{hrp}', expected '{ADDRESS_HRP}'"
            )));
        }
        let bytes = Vec::<u8>::from_base32(&data)
            .map_err(|e| AbiError::invalid_value(format!("bad bech32 payload '{value}': {e}")))?;
        Self::from_slice(&bytes)
    }

    /// Parse either a bech32 (`erd1...`) or a hex address
    pub fn parse(value: &str) -> AbiResult<Self> {
        let value = value.trim();
        if value.starts_with(ADDRESS_HRP) {
            return Self::from_bech32(value);
        }
        let hex_str = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .unwrap_or(value);
        let bytes = hex::decode(hex_str)
            .map_err(|e| AbiError::invalid_value(format!("bad address '{value}': {e}")))?;
        Self::from_slice(&bytes)
    }

    pub fn to_bech32(&self) -> String {
        bech32::encode(ADDRESS_HRP, self.0.to_base32(), Variant::Bech32)
            .unwrap_or_else(|_| hex::encode(self.0))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_bech32())
    }
}

/// A named value inside a struct or enum variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub name: String,
    pub value: TypedValue,
}

impl FieldValue {
    pub fn new(name: impl Into<String>, value: TypedValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructValue {
    pub name: String,
    pub fields: Vec<FieldValue>,
}

impl StructValue {
    pub fn field(&self, name: &str) -> Option<&TypedValue> {
        self.fields
            .iter()
            .find(|field| field.name == name)
            .map(|field| &field.value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    /// Variant name
    pub name: String,
    pub discriminant: u8,
    pub fields: Vec<FieldValue>,
}

/// A concrete value of some `TypeDescriptor`
///
/// Values own all their data; nothing borrows from the decoded buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypedValue {
    /// Any integer, signed or unsigned, fixed or arbitrary width
    Integer(BigInt),
    Bool(bool),
    Address(Address),
    H256([u8; 32]),
    CodeMetadata([u8; 2]),
    Nothing,
    TokenIdentifier(String),
    Bytes(Vec<u8>),
    Text(String),
    Struct(StructValue),
    Enum(EnumValue),
    /// Items of a list, array, variadic or counted variadic
    List(Vec<TypedValue>),
    /// Option or optional value
    Option(Option<Box<TypedValue>>),
    /// Items of a tuple or multi-value
    Tuple(Vec<TypedValue>),
}

impl TypedValue {
    pub fn integer(value: impl Into<BigInt>) -> Self {
        Self::Integer(value.into())
    }

    pub fn some(value: TypedValue) -> Self {
        Self::Option(Some(Box::new(value)))
    }

    pub fn none() -> Self {
        Self::Option(None)
    }

    pub fn structure(name: impl Into<String>, fields: Vec<FieldValue>) -> Self {
        Self::Struct(StructValue {
            name: name.into(),
            fields,
        })
    }

    pub fn variant(name: impl Into<String>, discriminant: u8, fields: Vec<FieldValue>) -> Self {
        Self::Enum(EnumValue {
            name: name.into(),
            discriminant,
            fields,
        })
    }

    pub fn as_integer(&self) -> Option<&BigInt> {
        match self {
            Self::Integer(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(bytes) => Some(bytes),
            Self::TokenIdentifier(text) | Self::Text(text) => Some(text.as_bytes()),
            _ => None,
        }
    }

    /// Field lookup on struct values
    pub fn field(&self, name: &str) -> Option<&TypedValue> {
        match self {
            Self::Struct(value) => value.field(name),
            Self::Enum(value) => value
                .fields
                .iter()
                .find(|field| field.name == name)
                .map(|field| &field.value),
            _ => None,
        }
    }

    /// Short name of the value's shape, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Bool(_) => "bool",
            Self::Address(_) => "address",
            Self::H256(_) => "h256",
            Self::CodeMetadata(_) => "code metadata",
            Self::Nothing => "nothing",
            Self::TokenIdentifier(_) => "token identifier",
            Self::Bytes(_) => "bytes",
            Self::Text(_) => "string",
            Self::Struct(_) => "struct",
            Self::Enum(_) => "enum",
            Self::List(_) => "list",
            Self::Option(_) => "option",
            Self::Tuple(_) => "tuple",
        }
    }
}

struct FieldsMap<'a>(&'a [FieldValue]);

impl Serialize for FieldsMap<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for field in self.0 {
            map.serialize_entry(&field.name, &field.value)?;
        }
        map.end()
    }
}

/// JSON rendering: integers as decimal strings, addresses as bech32,
/// raw bytes as hex, structs as objects in declaration order.
impl Serialize for TypedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Integer(value) => serializer.serialize_str(&value.to_string()),
            Self::Bool(value) => serializer.serialize_bool(*value),
            Self::Address(address) => serializer.serialize_str(&address.to_bech32()),
            Self::H256(hash) => serializer.serialize_str(&hex::encode(hash)),
            Self::CodeMetadata(flags) => serializer.serialize_str(&hex::encode(flags)),
            Self::Nothing => serializer.serialize_unit(),
            Self::TokenIdentifier(text) | Self::Text(text) => serializer.serialize_str(text),
            Self::Bytes(bytes) => serializer.serialize_str(&hex::encode(bytes)),
            Self::Struct(value) => FieldsMap(&value.fields).serialize(serializer),
            Self::Enum(value) => {
                let len = if value.fields.is_empty() { 1 } else { 2 };
                let mut map = serializer.serialize_map(Some(len))?;
                map.serialize_entry("name", &value.name)?;
                if !value.fields.is_empty() {
                    map.serialize_entry("fields", &FieldsMap(&value.fields))?;
                }
                map.end()
            }
            Self::List(items) | Self::Tuple(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Option(None) => serializer.serialize_none(),
            Self::Option(Some(inner)) => inner.serialize(serializer),
        }
    }
}
