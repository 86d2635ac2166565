//! ABI infrastructure - binary codec, results parsing, argument encoding

pub mod codec;
mod loader;
mod native;
mod results;

pub use codec::{
    BinaryCodec, CodecConfig, DEFAULT_MAX_DEPTH, DEFAULT_MAX_ELEMENTS, MAX_DEPTH_LIMIT,
};
pub use loader::{expand_home, fetch_abi, is_url, load_abi, load_abi_file};
pub use native::{build_call_data, encode_arguments, native_arguments, native_to_typed};
pub use results::{
    split_result_data, CallOutcome, ContractErrorOutcome, EventLog, QueryResponse, ResultsParser,
    ReturnCode, UntypedOutcome,
};
