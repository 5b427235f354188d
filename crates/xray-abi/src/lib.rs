//! Runtime-typed contract reads: type catalogue, selector derivation, ABI
//! encoding/decoding and the `eth_call` glue that ties them to a node.

pub mod codec;
pub mod error;
pub mod reader;
pub mod registry;

pub use codec::{
    decode_as, decode_params, encode_indexed_call, encode_params, encode_return,
    encode_zero_arg_call, parse_index, AbiValue, CallSpec,
};
pub use error::{AbiError, ReadError};
pub use reader::{ContractReader, Reserves};
pub use registry::{selector, AbiType, TypeRegistry};
