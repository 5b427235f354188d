//! Contract field reads: encode, `eth_call`, decode.

use alloy::primitives::{Address, U256};
use std::sync::Arc;
use xray_data::NodeClient;

use crate::codec::{decode_params, encode_zero_arg_call, AbiValue, CallSpec};
use crate::error::ReadError;
use crate::registry::{AbiType, TypeRegistry};

/// Reserves of a Uniswap-V2-style pair (`getReserves()`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reserves {
    pub reserve0: U256,
    pub reserve1: U256,
    pub block_timestamp_last: u32,
}

fn unexpected(expected: &'static str, found: AbiValue) -> ReadError {
    ReadError::UnexpectedValue {
        expected,
        found: found.to_string(),
    }
}

/// Reads view fields from arbitrary contracts through one node.
#[derive(Clone, Debug)]
pub struct ContractReader {
    node: NodeClient,
    registry: Arc<TypeRegistry>,
}

impl ContractReader {
    pub fn new(node: NodeClient, registry: Arc<TypeRegistry>) -> Self {
        Self { node, registry }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Runs one call and decodes its result.
    #[tracing::instrument(skip(self, spec), fields(contract = %spec.contract, field = %spec.field))]
    pub async fn execute(&self, spec: &CallSpec, at: Option<u64>) -> Result<AbiValue, ReadError> {
        let payload = spec.encode()?;
        let raw = self.node.call(spec.contract, &payload, at).await?;
        let value = spec.decode(&raw)?;
        tracing::debug!(returns = %spec.returns, raw_len = raw.len(), "decoded contract field");
        Ok(value)
    }

    /// Reads `field()` as the type named `type_name`.
    ///
    /// # Errors
    /// Fails with [`ReadError::Abi`] before any I/O if `type_name` is not in
    /// the registry or `field` is not a valid function name.
    pub async fn read_field(
        &self,
        contract: Address,
        field: &str,
        type_name: &str,
        at: Option<u64>,
    ) -> Result<AbiValue, ReadError> {
        let returns = self.registry.lookup(type_name)?.clone();
        self.execute(&CallSpec::field(contract, field, returns), at)
            .await
    }

    /// Reads `map(index)` as the type named `type_name`.
    pub async fn read_indexed(
        &self,
        contract: Address,
        map: &str,
        index: U256,
        type_name: &str,
        at: Option<u64>,
    ) -> Result<AbiValue, ReadError> {
        let returns = self.registry.lookup(type_name)?.clone();
        self.execute(&CallSpec::indexed(contract, map, index, returns), at)
            .await
    }

    pub async fn read_uint(
        &self,
        contract: Address,
        field: &str,
        at: Option<u64>,
    ) -> Result<U256, ReadError> {
        let spec = CallSpec::field(contract, field, AbiType::Uint(256));
        match self.execute(&spec, at).await? {
            AbiValue::Uint(value) => Ok(value),
            other => Err(unexpected("uint256", other)),
        }
    }

    pub async fn read_string(
        &self,
        contract: Address,
        field: &str,
        at: Option<u64>,
    ) -> Result<String, ReadError> {
        let spec = CallSpec::field(contract, field, AbiType::String);
        match self.execute(&spec, at).await? {
            AbiValue::String(value) => Ok(value),
            other => Err(unexpected("string", other)),
        }
    }

    pub async fn read_address(
        &self,
        contract: Address,
        field: &str,
        at: Option<u64>,
    ) -> Result<Address, ReadError> {
        let spec = CallSpec::field(contract, field, AbiType::Address);
        match self.execute(&spec, at).await? {
            AbiValue::Address(value) => Ok(value),
            other => Err(unexpected("address", other)),
        }
    }

    pub async fn read_bool(
        &self,
        contract: Address,
        field: &str,
        at: Option<u64>,
    ) -> Result<bool, ReadError> {
        let spec = CallSpec::field(contract, field, AbiType::Bool);
        match self.execute(&spec, at).await? {
            AbiValue::Bool(value) => Ok(value),
            other => Err(unexpected("bool", other)),
        }
    }

    pub async fn read_address_array(
        &self,
        contract: Address,
        field: &str,
        at: Option<u64>,
    ) -> Result<Vec<Address>, ReadError> {
        let spec = CallSpec::field(contract, field, AbiType::Array(Box::new(AbiType::Address)));
        match self.execute(&spec, at).await? {
            AbiValue::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    AbiValue::Address(address) => Ok(address),
                    other => Err(unexpected("address", other)),
                })
                .collect(),
            other => Err(unexpected("address[]", other)),
        }
    }

    /// Reads entry `index` of an address list exposed as `map(uint256)`,
    /// e.g. a factory's `allPairs`.
    pub async fn read_list_address(
        &self,
        contract: Address,
        map: &str,
        index: U256,
        at: Option<u64>,
    ) -> Result<Address, ReadError> {
        let spec = CallSpec::indexed(contract, map, index, AbiType::Address);
        match self.execute(&spec, at).await? {
            AbiValue::Address(value) => Ok(value),
            other => Err(unexpected("address", other)),
        }
    }

    /// `getReserves()` of a pair, optionally at a historical height.
    #[tracing::instrument(skip(self))]
    pub async fn read_reserves(&self, pair: Address, at: Option<u64>) -> Result<Reserves, ReadError> {
        let raw = self
            .node
            .call(pair, &encode_zero_arg_call("getReserves")?, at)
            .await?;
        let values = decode_params(&raw, &[AbiType::Uint(112), AbiType::Uint(112), AbiType::Uint(32)])?;

        match values.as_slice() {
            [AbiValue::Uint(reserve0), AbiValue::Uint(reserve1), AbiValue::Uint(timestamp)] => {
                Ok(Reserves {
                    reserve0: *reserve0,
                    reserve1: *reserve1,
                    block_timestamp_last: u32::try_from(timestamp.as_limbs()[0])
                        .map_err(|_| unexpected("uint32", AbiValue::Uint(*timestamp)))?,
                })
            }
            _ => Err(ReadError::UnexpectedValue {
                expected: "(uint112,uint112,uint32)",
                found: format!("{} values", values.len()),
            }),
        }
    }
}
