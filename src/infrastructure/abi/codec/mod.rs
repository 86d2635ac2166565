//! Binary codec for contract values
//!
//! Two framings exist. *Top-level* is used for a standalone value whose
//! length is the length of its buffer; *nested* is used inside containers
//! and is always self-delimiting. Only the outermost value of a top-level
//! call uses top-level framing, everything it contains is nested.

mod decode;
mod encode;
pub mod numeric;

use std::borrow::Cow;

use crate::domain::abi::{
    AbiCodec, AbiError, AbiRegistry, AbiResult, Decoded, TypeDescriptor, TypedValue,
};

use decode::Decoder;
use encode::Encoder;

/// Default limit on container nesting for a single encode/decode call
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Hard ceiling on `max_depth`, whatever the configuration asks for
pub const MAX_DEPTH_LIMIT: usize = 256;

/// Default limit on values produced by a single decode call
pub const DEFAULT_MAX_ELEMENTS: usize = 1 << 22;

/// Limits applied per call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecConfig {
    pub max_depth: usize,
    pub max_elements: usize,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_elements: DEFAULT_MAX_ELEMENTS,
        }
    }
}

/// Binary codec bound to an (optional) registry for custom-type lookups
///
/// The codec holds no mutable state; every call builds its own counters.
#[derive(Debug, Clone, Copy)]
pub struct BinaryCodec<'r> {
    registry: Option<&'r AbiRegistry>,
    config: CodecConfig,
}

impl<'r> BinaryCodec<'r> {
    pub fn new(registry: &'r AbiRegistry) -> Self {
        Self {
            registry: Some(registry),
            config: CodecConfig::default(),
        }
    }

    /// Codec for types that contain no custom-type references
    pub fn standalone() -> BinaryCodec<'static> {
        BinaryCodec {
            registry: None,
            config: CodecConfig::default(),
        }
    }

    /// `max_depth` is clamped to [`MAX_DEPTH_LIMIT`]
    pub fn with_config(mut self, config: CodecConfig) -> Self {
        self.config = CodecConfig {
            max_depth: config.max_depth.min(MAX_DEPTH_LIMIT),
            ..config
        };
        self
    }

    /// Replace a custom-type reference by the type it names
    pub(crate) fn resolve<'t>(&self, ty: &'t TypeDescriptor) -> AbiResult<Cow<'t, TypeDescriptor>> {
        match ty {
            TypeDescriptor::Custom(name) => self
                .registry
                .and_then(|registry| registry.custom_type(name))
                .map(|custom| Cow::Owned(custom.descriptor()))
                .ok_or_else(|| AbiError::UnresolvedType(name.clone())),
            other => Ok(Cow::Borrowed(other)),
        }
    }
}

impl AbiCodec for BinaryCodec<'_> {
    fn encode_top_level(&self, value: &TypedValue, ty: &TypeDescriptor) -> AbiResult<Vec<u8>> {
        Encoder::new(*self).top_level(value, ty)
    }

    fn encode_nested(&self, value: &TypedValue, ty: &TypeDescriptor) -> AbiResult<Vec<u8>> {
        let mut out = Vec::new();
        Encoder::new(*self).nested(value, ty, &mut out)?;
        Ok(out)
    }

    fn decode_top_level(&self, data: &[u8], ty: &TypeDescriptor) -> AbiResult<TypedValue> {
        tracing::trace!(ty = %ty, len = data.len(), "decode top-level");
        Decoder::new(*self, data.len()).top_level(data, ty)
    }

    fn decode_nested(&self, data: &[u8], ty: &TypeDescriptor) -> AbiResult<Decoded> {
        tracing::trace!(ty = %ty, len = data.len(), "decode nested");
        Decoder::new(*self, data.len()).nested(data, ty)
    }
}
