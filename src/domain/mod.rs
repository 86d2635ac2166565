//! Domain layer - codec-independent models

pub mod abi;
