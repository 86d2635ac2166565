//! ABI domain models and contracts
//!
//! This module defines the type model, the registry and the codec trait,
//! independent of the codec implementation.

mod codec;
mod document;
mod error;
mod parser;
mod registry;
mod types;
mod value;

pub use codec::{AbiCodec, Decoded};
pub use document::AbiDocument;
pub use error::{AbiError, AbiResult};
pub use parser::{
    parse_type, parse_type_with_depth, CustomTypeLookup, NoCustomTypes, DEFAULT_MAX_TYPE_DEPTH,
};
pub use registry::{
    validate_nested, validate_top_level, AbiRegistry, EndpointDefinition, EventDefinition,
    EventInput, ParamSpec,
};
pub use types::{
    CustomType, EnumDefinition, EnumVariantDefinition, FieldDefinition, IntWidth,
    StructDefinition, TypeDescriptor,
};
pub use value::{Address, EnumValue, FieldValue, StructValue, TypedValue, ADDRESS_LEN};
