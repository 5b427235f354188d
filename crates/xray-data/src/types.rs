//! Wire mirrors of node JSON and the domain types built from them.
//!
//! Node responses carry every quantity as a `0x`-prefixed hex string. The
//! `Rpc*` structs keep that text as-is; conversion into domain types goes
//! through the `parse_*` helpers so malformed payloads surface as errors
//! instead of silently becoming zero.

use alloy::primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::NodeError;

/// Block as returned by `eth_getBlockByNumber(height, true)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcBlock {
    pub number: Option<String>,
    pub hash: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub transactions: Vec<RpcTransaction>,
}

/// Full transaction object embedded in a block or returned by
/// `eth_getTransactionByHash`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcTransaction {
    pub hash: String,
    pub nonce: String,
    /// Recipient; `None` for contract creation.
    #[serde(default)]
    pub to: Option<String>,
    pub value: String,
    /// Gas limit.
    pub gas: String,
    /// Gas price in wei (effective price for mined dynamic-fee transactions).
    #[serde(default)]
    pub gas_price: Option<String>,
    #[serde(default)]
    pub max_fee_per_gas: Option<String>,
    pub input: String,
    /// EIP-2718 type; absent on pre-typed nodes.
    #[serde(default, rename = "type")]
    pub tx_type: Option<String>,
    #[serde(default)]
    pub chain_id: Option<String>,
    #[serde(default)]
    pub transaction_index: Option<String>,
    /// Signature fields; some nodes omit them for system transactions.
    #[serde(default)]
    pub v: Option<String>,
    #[serde(default)]
    pub r: Option<String>,
    #[serde(default)]
    pub s: Option<String>,
}

/// Execution receipt from `eth_getTransactionReceipt`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcReceipt {
    pub transaction_hash: String,
    /// `0x1` on success, `0x0` on revert; absent on pre-Byzantium receipts.
    #[serde(default)]
    pub status: Option<String>,
    pub gas_used: String,
    #[serde(default)]
    pub effective_gas_price: Option<String>,
}

impl RpcReceipt {
    pub fn succeeded(&self) -> bool {
        matches!(self.status.as_deref().map(parse_quantity_u64), Some(Ok(1)))
    }
}

/// Event log entry from `eth_getLogs`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcLog {
    pub address: String,
    #[serde(default)]
    pub topics: Vec<String>,
    pub data: String,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
    #[serde(default)]
    pub log_index: Option<String>,
    #[serde(default)]
    pub removed: bool,
}

/// Range/topic filter for `eth_getLogs`.
///
/// `topics` is an OR-set matched against topic0; empty means any event.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LogFilter {
    pub from_block: u64,
    pub to_block: u64,
    pub topics: Vec<B256>,
    pub addresses: Vec<Address>,
}

impl LogFilter {
    pub fn range(from_block: u64, to_block: u64) -> Self {
        Self {
            from_block,
            to_block,
            ..Self::default()
        }
    }

    pub fn with_topics(mut self, topics: Vec<B256>) -> Self {
        self.topics = topics;
        self
    }

    pub fn with_addresses(mut self, addresses: Vec<Address>) -> Self {
        self.addresses = addresses;
        self
    }

    pub(crate) fn to_params(&self) -> serde_json::Value {
        let mut filter = serde_json::json!({
            "fromBlock": format!("0x{:x}", self.from_block),
            "toBlock": format!("0x{:x}", self.to_block),
        });
        if !self.topics.is_empty() {
            let topic0: Vec<String> = self.topics.iter().map(|t| format!("{t:#x}")).collect();
            filter["topics"] = serde_json::json!([topic0]);
        }
        if !self.addresses.is_empty() {
            let addresses: Vec<String> =
                self.addresses.iter().map(|a| format!("{a:#x}")).collect();
            filter["address"] = serde_json::json!(addresses);
        }
        serde_json::json!([filter])
    }
}

/// A mined transaction joined with its receipt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub hash: B256,
    /// Recovered sender; `None` when signature recovery failed.
    pub from: Option<Address>,
    /// Recipient; `None` for contract creation.
    pub to: Option<Address>,
    pub nonce: u64,
    /// Transferred value in wei.
    pub value: U256,
    pub gas_limit: u64,
    /// Gas price in wei.
    pub gas_price: U256,
    pub data_length: usize,
    /// Receipt status is `0x1`.
    pub success: bool,
    /// Gas consumed, from the receipt.
    pub gas_used: u64,
}

impl Transaction {
    /// Builds a transaction from its wire form and its receipt.
    ///
    /// # Errors
    /// Returns [`NodeError::InvalidResponse`] if a field is malformed or the
    /// receipt belongs to a different transaction.
    pub fn from_rpc(
        tx: &RpcTransaction,
        receipt: &RpcReceipt,
        from: Option<Address>,
    ) -> Result<Self, NodeError> {
        const METHOD: &str = "eth_getBlockByNumber";
        let invalid = |field: &str, e: String| NodeError::invalid(METHOD, format!("{field}: {e}"));

        let hash = parse_b256(&tx.hash).map_err(|e| invalid("hash", e))?;
        let receipt_hash = parse_b256(&receipt.transaction_hash)
            .map_err(|e| invalid("receipt.transactionHash", e))?;
        if hash != receipt_hash {
            return Err(NodeError::invalid(
                "eth_getTransactionReceipt",
                format!("receipt {receipt_hash} does not belong to transaction {hash}"),
            ));
        }

        let to = tx
            .to
            .as_deref()
            .map(parse_address)
            .transpose()
            .map_err(|e| invalid("to", e))?;
        let gas_price = tx
            .gas_price
            .as_deref()
            .or(tx.max_fee_per_gas.as_deref())
            .map(parse_quantity_u256)
            .transpose()
            .map_err(|e| invalid("gasPrice", e))?
            .unwrap_or_default();
        let input = parse_bytes(&tx.input).map_err(|e| invalid("input", e))?;

        Ok(Self {
            hash,
            from,
            to,
            nonce: parse_quantity_u64(&tx.nonce).map_err(|e| invalid("nonce", e))?,
            value: parse_quantity_u256(&tx.value).map_err(|e| invalid("value", e))?,
            gas_limit: parse_quantity_u64(&tx.gas).map_err(|e| invalid("gas", e))?,
            gas_price,
            data_length: input.len(),
            success: receipt.succeeded(),
            gas_used: parse_quantity_u64(&receipt.gas_used)
                .map_err(|e| invalid("receipt.gasUsed", e))?,
        })
    }
}

fn strip_hex(value: &str) -> &str {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value)
}

/// Parses a hex quantity (`0x1a`) into a `u64`. `0x` alone is zero.
pub fn parse_quantity_u64(value: &str) -> Result<u64, String> {
    let digits = strip_hex(value);
    if digits.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(digits, 16).map_err(|e| format!("`{value}`: {e}"))
}

/// Parses a hex quantity into a 256-bit integer. `0x` alone is zero.
pub fn parse_quantity_u256(value: &str) -> Result<U256, String> {
    let digits = strip_hex(value);
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16).map_err(|e| format!("`{value}`: {e}"))
}

pub fn parse_address(value: &str) -> Result<Address, String> {
    Address::from_str(value).map_err(|e| format!("`{value}`: {e}"))
}

pub fn parse_b256(value: &str) -> Result<B256, String> {
    B256::from_str(value).map_err(|e| format!("`{value}`: {e}"))
}

pub fn parse_bytes(value: &str) -> Result<Bytes, String> {
    Bytes::from_str(value).map_err(|e| format!("`{value}`: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tx() -> RpcTransaction {
        RpcTransaction {
            hash: format!("0x{}", "11".repeat(32)),
            nonce: "0x9".to_string(),
            to: Some("0x3535353535353535353535353535353535353535".to_string()),
            value: "0xde0b6b3a7640000".to_string(),
            gas: "0x5208".to_string(),
            gas_price: Some("0x4a817c800".to_string()),
            max_fee_per_gas: None,
            input: "0xdeadbeef".to_string(),
            tx_type: Some("0x0".to_string()),
            chain_id: None,
            transaction_index: Some("0x0".to_string()),
            v: Some("0x25".to_string()),
            r: Some("0x1".to_string()),
            s: Some("0x1".to_string()),
        }
    }

    fn sample_receipt(hash: &str) -> RpcReceipt {
        RpcReceipt {
            transaction_hash: hash.to_string(),
            status: Some("0x1".to_string()),
            gas_used: "0x5208".to_string(),
            effective_gas_price: None,
        }
    }

    #[test]
    fn quantities_parse_hex() {
        assert_eq!(parse_quantity_u64("0x5208"), Ok(21_000));
        assert_eq!(parse_quantity_u64("0x"), Ok(0));
        assert!(parse_quantity_u64("0xzz").is_err());
        assert_eq!(
            parse_quantity_u256("0xde0b6b3a7640000"),
            Ok(U256::from(1_000_000_000_000_000_000u128))
        );
    }

    #[test]
    fn transaction_joins_receipt_fields() {
        let tx = sample_tx();
        let receipt = sample_receipt(&tx.hash);

        let joined = Transaction::from_rpc(&tx, &receipt, None).expect("valid transaction");

        assert_eq!(joined.nonce, 9);
        assert_eq!(joined.gas_limit, 21_000);
        assert_eq!(joined.gas_used, 21_000);
        assert_eq!(joined.gas_price, U256::from(20_000_000_000u64));
        assert_eq!(joined.data_length, 4);
        assert!(joined.success);
        assert!(joined.to.is_some());
    }

    #[test]
    fn contract_creation_has_no_recipient() {
        let mut tx = sample_tx();
        tx.to = None;
        let receipt = sample_receipt(&tx.hash);

        let joined = Transaction::from_rpc(&tx, &receipt, None).expect("valid transaction");
        assert_eq!(joined.to, None);
    }

    #[test]
    fn dynamic_fee_transaction_falls_back_to_max_fee() {
        let mut tx = sample_tx();
        tx.gas_price = None;
        tx.max_fee_per_gas = Some("0x3b9aca00".to_string());
        let receipt = sample_receipt(&tx.hash);

        let joined = Transaction::from_rpc(&tx, &receipt, None).expect("valid transaction");
        assert_eq!(joined.gas_price, U256::from(1_000_000_000u64));
    }

    #[test]
    fn mismatched_receipt_is_rejected() {
        let tx = sample_tx();
        let receipt = sample_receipt(&format!("0x{}", "22".repeat(32)));

        let err = Transaction::from_rpc(&tx, &receipt, None).unwrap_err();
        assert!(matches!(err, NodeError::InvalidResponse { .. }));
    }

    #[test]
    fn reverted_receipt_is_not_success() {
        let mut receipt = sample_receipt("0x00");
        receipt.status = Some("0x0".to_string());
        assert!(!receipt.succeeded());
        receipt.status = None;
        assert!(!receipt.succeeded());
    }

    #[test]
    fn log_filter_params_include_optional_narrowing() {
        let topic = B256::repeat_byte(0xaa);
        let address = Address::repeat_byte(0x11);
        let params = LogFilter::range(16, 32)
            .with_topics(vec![topic])
            .with_addresses(vec![address])
            .to_params();

        assert_eq!(params[0]["fromBlock"], "0x10");
        assert_eq!(params[0]["toBlock"], "0x20");
        assert_eq!(params[0]["topics"][0][0], format!("{topic:#x}"));
        assert_eq!(params[0]["address"][0], format!("{address:#x}"));

        let bare = LogFilter::range(1, 1).to_params();
        assert!(bare[0].get("topics").is_none());
        assert!(bare[0].get("address").is_none());
    }
}
