//! Infrastructure layer - codec implementation and external services
//!
//! This layer contains:
//! - The binary codec, results parser and argument encoder
//! - ABI loading from files and URLs
//! - The API-backed transaction event source

pub mod abi;
pub mod network;

pub use abi::{BinaryCodec, ResultsParser};
pub use network::{ApiTransactionSource, TransactionSource};
