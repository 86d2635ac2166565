//! Codec trait and the shapes it works with

use super::error::AbiResult;
use super::types::TypeDescriptor;
use super::value::TypedValue;

/// A value decoded from the front of a buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub value: TypedValue,
    /// Number of bytes the value occupied
    pub bytes_read: usize,
}

/// Trait for binary codec implementations
///
/// Implementations must be pure: no state shared between calls, so a single
/// instance can serve many threads at once.
pub trait AbiCodec: Send + Sync {
    /// Encode a standalone value (one argument or one output)
    fn encode_top_level(&self, value: &TypedValue, ty: &TypeDescriptor) -> AbiResult<Vec<u8>>;

    /// Encode a value that is embedded in a larger structure
    fn encode_nested(&self, value: &TypedValue, ty: &TypeDescriptor) -> AbiResult<Vec<u8>>;

    /// Decode a standalone value; the whole buffer belongs to it
    fn decode_top_level(&self, data: &[u8], ty: &TypeDescriptor) -> AbiResult<TypedValue>;

    /// Decode one value from the front of `data`
    fn decode_nested(&self, data: &[u8], ty: &TypeDescriptor) -> AbiResult<Decoded>;
}
