//! Type descriptor model - the closed set of ABI types the codec understands

use std::fmt;
use std::sync::Arc;

/// Width of an integer type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
    W128,
    W256,
    /// `BigUint` / `BigInt`: length-prefixed when nested
    Arbitrary,
}

impl IntWidth {
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::W8),
            16 => Some(Self::W16),
            32 => Some(Self::W32),
            64 => Some(Self::W64),
            128 => Some(Self::W128),
            256 => Some(Self::W256),
            _ => None,
        }
    }

    /// Number of bytes used by the nested encoding, `None` for arbitrary width
    pub fn byte_len(self) -> Option<usize> {
        match self {
            Self::W8 => Some(1),
            Self::W16 => Some(2),
            Self::W32 => Some(4),
            Self::W64 => Some(8),
            Self::W128 => Some(16),
            Self::W256 => Some(32),
            Self::Arbitrary => None,
        }
    }
}

/// A named field of a struct or enum variant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub name: String,
    pub ty: TypeDescriptor,
}

impl FieldDefinition {
    /// Field with an already parsed type
    pub fn new(name: impl Into<String>, ty: TypeDescriptor) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Struct definition. Field order is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDefinition {
    pub name: String,
    pub fields: Vec<FieldDefinition>,
}

impl StructDefinition {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDefinition>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }
}

/// One variant of an enum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumVariantDefinition {
    pub name: String,
    pub discriminant: u8,
    pub fields: Vec<FieldDefinition>,
}

impl EnumVariantDefinition {
    /// Fieldless variants pass an empty `fields`
    pub fn new(name: impl Into<String>, discriminant: u8, fields: Vec<FieldDefinition>) -> Self {
        Self {
            name: name.into(),
            discriminant,
            fields,
        }
    }
}

/// Enum definition (tagged union with a single-byte discriminant)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDefinition {
    pub name: String,
    pub variants: Vec<EnumVariantDefinition>,
}

impl EnumDefinition {
    pub fn new(name: impl Into<String>, variants: Vec<EnumVariantDefinition>) -> Self {
        Self {
            name: name.into(),
            variants,
        }
    }

    pub fn variant_by_discriminant(&self, discriminant: u8) -> Option<&EnumVariantDefinition> {
        self.variants
            .iter()
            .find(|variant| variant.discriminant == discriminant)
    }

    pub fn variant_by_name(&self, name: &str) -> Option<&EnumVariantDefinition> {
        self.variants.iter().find(|variant| variant.name == name)
    }
}

/// A user-defined type from the ABI `"types"` section
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CustomType {
    Struct(Arc<StructDefinition>),
    Enum(Arc<EnumDefinition>),
}

impl CustomType {
    pub fn name(&self) -> &str {
        match self {
            Self::Struct(def) => &def.name,
            Self::Enum(def) => &def.name,
        }
    }

    /// The descriptor the codec works with
    pub fn descriptor(&self) -> TypeDescriptor {
        match self {
            Self::Struct(def) => TypeDescriptor::Struct(Arc::clone(def)),
            Self::Enum(def) => TypeDescriptor::Enum(Arc::clone(def)),
        }
    }
}

/// Describes one ABI type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDescriptor {
    Integer { signed: bool, width: IntWidth },
    Bool,
    /// 32-byte account address
    Address,
    /// 32-byte hash
    H256,
    /// 2-byte code metadata flags
    CodeMetadata,
    /// Zero-sized unit type
    Nothing,
    TokenIdentifier,
    Bytes,
    Utf8String,
    Struct(Arc<StructDefinition>),
    Enum(Arc<EnumDefinition>),
    List(Box<TypeDescriptor>),
    Array(usize, Box<TypeDescriptor>),
    Option(Box<TypeDescriptor>),
    Tuple(Vec<TypeDescriptor>),
    /// Length implied by the remaining input; top level only
    Variadic(Box<TypeDescriptor>),
    /// Explicit 4-byte count followed by the items
    CountedVariadic(Box<TypeDescriptor>),
    /// Top-level value that may be missing entirely
    OptionalValue(Box<TypeDescriptor>),
    /// Top-level multi-value spanning several raw outputs
    Composite(Vec<TypeDescriptor>),
    /// Reference to a custom type, resolved against the registry
    Custom(String),
}

impl TypeDescriptor {
    /// Unsigned integer of the given width; `Arbitrary` is `BigUint`
    pub fn unsigned(width: IntWidth) -> Self {
        Self::Integer {
            signed: false,
            width,
        }
    }

    /// Signed integer of the given width; `Arbitrary` is `BigInt`
    pub fn signed(width: IntWidth) -> Self {
        Self::Integer {
            signed: true,
            width,
        }
    }

    /// Shorthands for the common fixed widths
    pub fn u8() -> Self {
        Self::unsigned(IntWidth::W8)
    }

    pub fn u16() -> Self {
        Self::unsigned(IntWidth::W16)
    }

    pub fn u32() -> Self {
        Self::unsigned(IntWidth::W32)
    }

    pub fn u64() -> Self {
        Self::unsigned(IntWidth::W64)
    }

    /// Arbitrary-width unsigned integer
    pub fn big_uint() -> Self {
        Self::unsigned(IntWidth::Arbitrary)
    }

    /// Arbitrary-width signed integer
    pub fn big_int() -> Self {
        Self::signed(IntWidth::Arbitrary)
    }

    /// `List<item>`, length-prefixed when nested
    pub fn list(item: TypeDescriptor) -> Self {
        Self::List(Box::new(item))
    }

    /// `arrayN<item>`: exactly `len` items, no prefix
    pub fn array(len: usize, item: TypeDescriptor) -> Self {
        Self::Array(len, Box::new(item))
    }

    /// `Option<inner>`: a `0x00`/`0x01` presence byte when nested
    pub fn option(inner: TypeDescriptor) -> Self {
        Self::Option(Box::new(inner))
    }

    /// `variadic<item>`: one raw output per item
    pub fn variadic(item: TypeDescriptor) -> Self {
        Self::Variadic(Box::new(item))
    }

    /// `counted-variadic<item>`: a count output followed by the items
    pub fn counted_variadic(item: TypeDescriptor) -> Self {
        Self::CountedVariadic(Box::new(item))
    }

    /// `optional<inner>`: may be omitted when trailing
    pub fn optional(inner: TypeDescriptor) -> Self {
        Self::OptionalValue(Box::new(inner))
    }

    /// Reference to a custom type by name.
    ///
    /// Codecs look the name up in their registry when they reach it, so
    /// self-referencing types stay finite.
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Direct type arguments, used for usage validation
    pub fn children(&self) -> Vec<&TypeDescriptor> {
        match self {
            Self::List(inner)
            | Self::Array(_, inner)
            | Self::Option(inner)
            | Self::Variadic(inner)
            | Self::CountedVariadic(inner)
            | Self::OptionalValue(inner) => vec![inner.as_ref()],
            Self::Tuple(items) | Self::Composite(items) => items.iter().collect(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer {
                signed,
                width: IntWidth::Arbitrary,
            } => f.write_str(if *signed { "BigInt" } else { "BigUint" }),
            Self::Integer { signed, width } => {
                let bits = width.byte_len().unwrap_or(0) * 8;
                write!(f, "{}{}", if *signed { "i" } else { "u" }, bits)
            }
            Self::Bool => f.write_str("bool"),
            Self::Address => f.write_str("Address"),
            Self::H256 => f.write_str("H256"),
            Self::CodeMetadata => f.write_str("CodeMetadata"),
            Self::Nothing => f.write_str("nothing"),
            Self::TokenIdentifier => f.write_str("TokenIdentifier"),
            Self::Bytes => f.write_str("bytes"),
            Self::Utf8String => f.write_str("utf-8 string"),
            Self::Struct(def) => f.write_str(&def.name),
            Self::Enum(def) => f.write_str(&def.name),
            Self::List(inner) => write!(f, "List<{inner}>"),
            Self::Array(len, inner) => write!(f, "array{len}<{inner}>"),
            Self::Option(inner) => write!(f, "Option<{inner}>"),
            Self::Tuple(items) => write_generic(f, "tuple", items),
            Self::Variadic(inner) => write!(f, "variadic<{inner}>"),
            Self::CountedVariadic(inner) => write!(f, "counted-variadic<{inner}>"),
            Self::OptionalValue(inner) => write!(f, "optional<{inner}>"),
            Self::Composite(items) => write_generic(f, "multi", items),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

fn write_generic(f: &mut fmt::Formatter<'_>, name: &str, items: &[TypeDescriptor]) -> fmt::Result {
    let inner: Vec<String> = items.iter().map(ToString::to_string).collect();
    write!(f, "{}<{}>", name, inner.join(","))
}
