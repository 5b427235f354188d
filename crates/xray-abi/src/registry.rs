//! Supported ABI types and function selectors.
//!
//! The catalogue is fixed: unsigned integers of 8/16/32/64/256 bits, `int8`,
//! `bool`, `address`, `bytes1`..`bytes32`, dynamic `bytes` and `string`, and
//! one-dimensional dynamic arrays of each. [`TypeRegistry::standard`] builds it
//! once; callers share it behind an `Arc`.

use alloy::primitives::{keccak256, Selector};
use std::collections::HashMap;
use std::fmt;

use crate::error::AbiError;

/// Encoding rules for one ABI type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum AbiType {
    /// Unsigned integer of the given bit width.
    Uint(u16),
    /// Two's-complement integer of the given bit width.
    Int(u16),
    Bool,
    Address,
    /// `bytesN`, left-aligned in one word.
    FixedBytes(u8),
    Bytes,
    String,
    /// `T[]`.
    Array(Box<AbiType>),
}

impl AbiType {
    /// Dynamic types are encoded as an offset in the head and a
    /// length-prefixed tail; static types occupy exactly one head word.
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Bytes | Self::String | Self::Array(_))
    }
}

impl fmt::Display for AbiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(bits) => write!(f, "uint{bits}"),
            Self::Int(bits) => write!(f, "int{bits}"),
            Self::Bool => f.write_str("bool"),
            Self::Address => f.write_str("address"),
            Self::FixedBytes(size) => write!(f, "bytes{size}"),
            Self::Bytes => f.write_str("bytes"),
            Self::String => f.write_str("string"),
            Self::Array(inner) => write!(f, "{inner}[]"),
        }
    }
}

/// Catalogue of type names accepted from callers.
#[derive(Clone, Debug)]
pub struct TypeRegistry {
    types: HashMap<String, AbiType>,
}

impl TypeRegistry {
    pub fn standard() -> Self {
        let mut scalars: Vec<(String, AbiType)> = [8u16, 16, 32, 64, 256]
            .into_iter()
            .map(|bits| (format!("uint{bits}"), AbiType::Uint(bits)))
            .collect();
        scalars.extend([
            ("uint".to_string(), AbiType::Uint(256)),
            ("int8".to_string(), AbiType::Int(8)),
            ("bool".to_string(), AbiType::Bool),
            ("address".to_string(), AbiType::Address),
            ("byte".to_string(), AbiType::FixedBytes(1)),
            ("bytes".to_string(), AbiType::Bytes),
            ("string".to_string(), AbiType::String),
        ]);
        scalars.extend((1..=32u8).map(|size| (format!("bytes{size}"), AbiType::FixedBytes(size))));

        let mut types = HashMap::with_capacity(scalars.len() * 2);
        for (name, ty) in scalars {
            types.insert(format!("{name}[]"), AbiType::Array(Box::new(ty.clone())));
            types.insert(name, ty);
        }

        Self { types }
    }

    /// Resolves a type name such as `uint256` or `address[]`.
    ///
    /// # Errors
    /// Returns [`AbiError::TypeNotSupported`] for names outside the catalogue.
    pub fn lookup(&self, name: &str) -> Result<&AbiType, AbiError> {
        let name = name.trim();
        self.types
            .get(name)
            .ok_or_else(|| AbiError::TypeNotSupported(name.to_string()))
    }

    /// Supported type names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

/// First four bytes of `keccak256("<name>(<arg,types>)")`.
pub fn selector(name: &str, arg_types: &[AbiType]) -> Selector {
    let args: Vec<String> = arg_types.iter().map(ToString::to_string).collect();
    let signature = format!("{name}({})", args.join(","));
    Selector::from_slice(&keccak256(signature.as_bytes())[..4])
}
