//! Contract ABI tooling for MultiversX smart contracts
//!
//! - [`domain::abi`]: type model, ABI registry, typed values, codec trait
//! - [`infrastructure::abi`]: binary codec, results/event parser, argument encoding
//! - [`infrastructure::network`]: transaction event sources
//! - [`modules::toolkit`]: the commands behind the `mxabi` binary

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod modules;

pub use domain::abi::{AbiCodec, AbiError, AbiRegistry, AbiResult, TypeDescriptor, TypedValue};
pub use infrastructure::abi::{BinaryCodec, CallOutcome, CodecConfig, ResultsParser, ReturnCode};
