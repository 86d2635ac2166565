//! Error taxonomy for ABI parsing, encoding and decoding

use thiserror::Error;

/// Result alias used throughout the codec
pub type AbiResult<T> = Result<T, AbiError>;

/// Errors produced by the registry, the type parser, the codec and the results parser.
///
/// A contract that reports a non-zero return code is not an error: see
/// `CallOutcome::ContractError`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    /// Malformed type-name string (e.g. `List<u8`, `u12`, `arrayX<u8>`)
    #[error("type syntax error in '{input}': {reason}")]
    TypeSyntax { input: String, reason: String },

    /// A custom type is referenced but never defined
    #[error("unresolved type '{0}'")]
    UnresolvedType(String),

    /// Lookup of an endpoint, event or custom type failed
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    /// The byte buffer does not match the type
    #[error("malformed data: {0}")]
    MalformedData(String),

    /// A type is used where it is not allowed (e.g. nested variadic)
    #[error("invalid type usage: {0}")]
    InvalidTypeUsage(String),

    /// The number of raw outputs does not match the declared outputs
    #[error("result arity mismatch: {0}")]
    ResultArity(String),

    /// A value does not fit the type it is encoded as
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// The ABI document itself is not well-formed
    #[error("invalid ABI document: {0}")]
    InvalidAbi(String),
}

impl AbiError {
    pub fn type_syntax(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TypeSyntax {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedData(msg.into())
    }

    pub fn invalid_usage(msg: impl Into<String>) -> Self {
        Self::InvalidTypeUsage(msg.into())
    }

    pub fn invalid_value(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }

    /// Whether the error was caused by the payload rather than the ABI
    pub fn is_data_error(&self) -> bool {
        matches!(self, Self::MalformedData(_) | Self::ResultArity(_))
    }
}
