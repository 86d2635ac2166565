//! Command modules
//!
//! - toolkit: decode, encode and call-data commands behind the CLI

pub mod toolkit;
