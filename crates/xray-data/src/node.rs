//! JSON-RPC client for the configured Ethereum node.
//!
//! Every method is a single round-trip over one long-lived, pooled
//! `reqwest::Client`. Requests are bounded by the client timeout and are
//! never retried; the first failure is returned to the caller.

use alloy::primitives::{hex, Address, Bytes, B256, U256};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::NodeError;
use crate::types::{
    parse_bytes, parse_quantity_u256, parse_quantity_u64, LogFilter, RpcBlock, RpcLog,
    RpcReceipt, RpcTransaction,
};

/// Default per-request deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection settings for [`NodeClient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeConfig {
    /// HTTP(S) URL of the JSON-RPC endpoint.
    pub rpc_url: String,
    /// Deadline applied to every round-trip.
    pub timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl NodeConfig {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorBody>,
}

/// Block parameter for state queries.
fn block_tag(at: Option<u64>) -> String {
    at.map_or_else(|| "latest".to_string(), |height| format!("0x{height:x}"))
}

/// Read-only handle on a JSON-RPC node. Cheap to clone.
#[derive(Clone, Debug)]
pub struct NodeClient {
    client: Client,
    rpc_url: Url,
}

impl NodeClient {
    /// Builds a client for `config.rpc_url`. Does not touch the network.
    ///
    /// # Errors
    /// Returns [`NodeError::InvalidUrl`] if the URL cannot be parsed and
    /// [`NodeError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &NodeConfig) -> Result<Self, NodeError> {
        let rpc_url = Url::parse(&config.rpc_url).map_err(|e| NodeError::InvalidUrl {
            url: config.rpc_url.clone(),
            message: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NodeError::from_reqwest("client", e))?;

        Ok(Self { client, rpc_url })
    }

    pub fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    /// Sends one JSON-RPC request. A `null` result comes back as `None`.
    async fn request<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<Option<T>, NodeError> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(self.rpc_url.clone())
            .json(&payload)
            .send()
            .await
            .map_err(|e| NodeError::from_reqwest(method, e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| NodeError::from_reqwest(method, e))?;

        // Some nodes pair a JSON-RPC error body with a non-2xx status, so the
        // body is inspected before the status.
        let rpc: RpcResponse<T> = match serde_json::from_slice(&body) {
            Ok(rpc) => rpc,
            Err(_) if !status.is_success() => {
                return Err(NodeError::Transport {
                    method,
                    message: format!("HTTP status {status}"),
                })
            }
            Err(e) => return Err(NodeError::invalid(method, e.to_string())),
        };

        if let Some(error) = rpc.error {
            tracing::debug!(method, code = error.code, message = %error.message, "node returned error");
            return Err(NodeError::Rpc {
                method,
                code: error.code,
                message: error.message,
            });
        }
        if !status.is_success() {
            return Err(NodeError::Transport {
                method,
                message: format!("HTTP status {status}"),
            });
        }

        Ok(rpc.result)
    }

    async fn request_required<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<T, NodeError> {
        self.request(method, params)
            .await?
            .ok_or_else(|| NodeError::invalid(method, "missing result"))
    }

    async fn request_quantity(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<String, NodeError> {
        self.request_required::<String>(method, params).await
    }

    /// Latest block height (`eth_blockNumber`).
    #[tracing::instrument(skip(self))]
    pub async fn block_number(&self) -> Result<u64, NodeError> {
        const METHOD: &str = "eth_blockNumber";
        let raw = self.request_quantity(METHOD, json!([])).await?;
        parse_quantity_u64(&raw).map_err(|e| NodeError::invalid(METHOD, e))
    }

    /// Full block with transaction objects (`eth_getBlockByNumber`).
    ///
    /// # Errors
    /// Returns [`NodeError::BlockNotFound`] when the node answers `null`.
    #[tracing::instrument(skip(self))]
    pub async fn get_block(&self, block_number: u64) -> Result<RpcBlock, NodeError> {
        let block: Option<RpcBlock> = self
            .request(
                "eth_getBlockByNumber",
                json!([format!("0x{block_number:x}"), true]),
            )
            .await?;

        block.ok_or_else(|| {
            tracing::debug!(block_number, "block not found");
            NodeError::BlockNotFound(block_number)
        })
    }

    /// Execution receipt of a transaction (`eth_getTransactionReceipt`).
    ///
    /// # Errors
    /// Returns [`NodeError::ReceiptNotFound`] when the node answers `null`.
    #[tracing::instrument(skip(self))]
    pub async fn get_receipt(&self, tx_hash: B256) -> Result<RpcReceipt, NodeError> {
        self.request("eth_getTransactionReceipt", json!([format!("{tx_hash:#x}")]))
            .await?
            .ok_or(NodeError::ReceiptNotFound(tx_hash))
    }

    /// Transaction by hash (`eth_getTransactionByHash`).
    #[tracing::instrument(skip(self))]
    pub async fn get_transaction(&self, tx_hash: B256) -> Result<RpcTransaction, NodeError> {
        self.request("eth_getTransactionByHash", json!([format!("{tx_hash:#x}")]))
            .await?
            .ok_or(NodeError::TransactionNotFound(tx_hash))
    }

    /// Read-only contract execution (`eth_call`).
    ///
    /// Sent from the zero address with zero value and zero gas price; the gas
    /// limit is left to the node. `at = None` queries the latest state.
    #[tracing::instrument(skip(self, data), fields(data_len = data.len()))]
    pub async fn call(
        &self,
        contract: Address,
        data: &Bytes,
        at: Option<u64>,
    ) -> Result<Bytes, NodeError> {
        const METHOD: &str = "eth_call";
        let params = json!([
            {
                "from": format!("{:#x}", Address::ZERO),
                "to": format!("{contract:#x}"),
                "gasPrice": "0x0",
                "value": "0x0",
                "data": hex::encode_prefixed(data),
            },
            block_tag(at),
        ]);

        let raw = self.request_quantity(METHOD, params).await?;
        parse_bytes(&raw).map_err(|e| NodeError::invalid(METHOD, e))
    }

    /// Event logs matching `filter` (`eth_getLogs`).
    #[tracing::instrument(skip(self))]
    pub async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RpcLog>, NodeError> {
        let logs: Option<Vec<RpcLog>> = self.request("eth_getLogs", filter.to_params()).await?;
        Ok(logs.unwrap_or_default())
    }

    async fn transaction_count(&self, address: Address, tag: &str) -> Result<u64, NodeError> {
        const METHOD: &str = "eth_getTransactionCount";
        let raw = self
            .request_quantity(METHOD, json!([format!("{address:#x}"), tag]))
            .await?;
        parse_quantity_u64(&raw).map_err(|e| NodeError::invalid(METHOD, e))
    }

    /// Confirmed transaction count of `address`.
    #[tracing::instrument(skip(self))]
    pub async fn nonce(&self, address: Address) -> Result<u64, NodeError> {
        self.transaction_count(address, "latest").await
    }

    /// Transaction count of `address` including pending transactions.
    #[tracing::instrument(skip(self))]
    pub async fn pending_nonce(&self, address: Address) -> Result<u64, NodeError> {
        self.transaction_count(address, "pending").await
    }

    /// Latest balance of `address` in wei (`eth_getBalance`).
    #[tracing::instrument(skip(self))]
    pub async fn balance(&self, address: Address) -> Result<U256, NodeError> {
        const METHOD: &str = "eth_getBalance";
        let raw = self
            .request_quantity(METHOD, json!([format!("{address:#x}"), "latest"]))
            .await?;
        parse_quantity_u256(&raw).map_err(|e| NodeError::invalid(METHOD, e))
    }

    /// Node's suggested gas price in wei (`eth_gasPrice`).
    #[tracing::instrument(skip(self))]
    pub async fn gas_price(&self) -> Result<U256, NodeError> {
        const METHOD: &str = "eth_gasPrice";
        let raw = self.request_quantity(METHOD, json!([])).await?;
        parse_quantity_u256(&raw).map_err(|e| NodeError::invalid(METHOD, e))
    }

    /// Gas prices of every transaction in a block, in block order.
    #[tracing::instrument(skip(self))]
    pub async fn block_gas_prices(&self, block_number: u64) -> Result<Vec<U256>, NodeError> {
        let block = self.get_block(block_number).await?;
        block
            .transactions
            .iter()
            .map(|tx| {
                tx.gas_price
                    .as_deref()
                    .or(tx.max_fee_per_gas.as_deref())
                    .map_or(Ok(U256::ZERO), parse_quantity_u256)
                    .map_err(|e| NodeError::invalid("eth_getBlockByNumber", e))
            })
            .collect()
    }

    /// `pending` subtree of the node's mempool (`txpool_content`).
    ///
    /// The subtree maps sender addresses to nonce-keyed transactions.
    #[tracing::instrument(skip(self))]
    pub async fn pending_pool(&self) -> Result<Value, NodeError> {
        const METHOD: &str = "txpool_content";
        let mut content: Value = self.request_required(METHOD, json!([])).await?;
        content
            .get_mut("pending")
            .map(Value::take)
            .ok_or_else(|| NodeError::invalid(METHOD, "missing `pending` subtree"))
    }
}
