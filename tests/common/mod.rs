//! Shared fixtures: a mockito-backed JSON-RPC node and canned block data.

#![allow(dead_code)]

use mockito::{Matcher, Mock, Server, ServerGuard};
use serde_json::{json, Value};
use std::sync::Arc;
use xray_abi::{ContractReader, TypeRegistry};
use xray_analysis::{AnalyzerConfig, BlockAnalyzer};
use xray_data::{NodeClient, NodeConfig};
use xray_server::AppState;

/// Sender of [`signed_transfer`] (the EIP-155 example transaction).
pub const SIGNED_TRANSFER_SENDER: &str = "0x9d8A62f656a8d1615C1294fd71e9CFb3E4855A4F";

/// Hash-shaped hex string derived from `n`.
pub fn tx_hash(n: u64) -> String {
    format!("0x{n:064x}")
}

/// ABI word holding `n`.
pub fn word(n: u64) -> String {
    format!("{n:064x}")
}

/// A mock node; mocks live as long as the returned handles.
pub struct MockNode {
    pub server: ServerGuard,
}

impl MockNode {
    pub async fn start() -> Self {
        Self {
            server: Server::new_async().await,
        }
    }

    pub fn url(&self) -> String {
        self.server.url()
    }

    pub fn client(&self) -> NodeClient {
        NodeClient::new(&NodeConfig::new(self.url())).expect("mock URL is valid")
    }

    pub fn analyzer(&self) -> BlockAnalyzer {
        BlockAnalyzer::new(self.client(), AnalyzerConfig::default())
    }

    pub fn reader(&self) -> ContractReader {
        ContractReader::new(self.client(), Arc::new(TypeRegistry::standard()))
    }

    pub fn app_state(&self) -> Arc<AppState> {
        Arc::new(AppState {
            analyzer: self.analyzer(),
            reader: self.reader(),
        })
    }

    /// Answers every request whose body contains `matcher` with `result`.
    pub async fn respond(&mut self, matcher: Value, result: Value) -> Mock {
        self.server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(matcher))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({ "jsonrpc": "2.0", "id": 1, "result": result }).to_string())
            .create_async()
            .await
    }

    pub async fn respond_method(&mut self, method: &str, result: Value) -> Mock {
        self.respond(json!({ "method": method }), result).await
    }

    pub async fn block(&mut self, block: Value) -> Mock {
        self.respond_method("eth_getBlockByNumber", block).await
    }

    pub async fn receipt(&mut self, hash: &str, gas_used: u64, success: bool) -> Mock {
        self.respond(
            json!({ "method": "eth_getTransactionReceipt", "params": [hash] }),
            receipt(hash, gas_used, success),
        )
        .await
    }

    /// Makes the receipt lookup for `hash` fail with a JSON-RPC error.
    pub async fn receipt_error(&mut self, hash: &str) -> Mock {
        self.server
            .mock("POST", "/")
            .match_body(Matcher::PartialJson(
                json!({ "method": "eth_getTransactionReceipt", "params": [hash] }),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "jsonrpc": "2.0",
                    "id": 1,
                    "error": { "code": -32000, "message": "header not found" }
                })
                .to_string(),
            )
            .create_async()
            .await
    }

    /// Answers `eth_call` with raw return data (`hex` without `0x`).
    pub async fn call_returns(&mut self, hex: &str) -> Mock {
        self.respond_method("eth_call", json!(format!("0x{hex}"))).await
    }
}

/// Legacy transfer with an unrecoverable signature.
pub fn unsigned_transfer(hash: &str, nonce: u64, gas_price: u64) -> Value {
    json!({
        "hash": hash,
        "nonce": format!("0x{nonce:x}"),
        "to": "0x3535353535353535353535353535353535353535",
        "value": "0x0",
        "gas": "0x30d40",
        "gasPrice": format!("0x{gas_price:x}"),
        "input": "0xa9059cbb",
        "v": "0x0",
        "r": "0x0",
        "s": "0x0"
    })
}

/// The EIP-155 example transaction: 1 ETH at 20 gwei, chain id 1.
pub fn signed_transfer(hash: &str) -> Value {
    json!({
        "hash": hash,
        "nonce": "0x9",
        "to": "0x3535353535353535353535353535353535353535",
        "value": "0xde0b6b3a7640000",
        "gas": "0x5208",
        "gasPrice": "0x4a817c800",
        "input": "0x",
        "v": "0x25",
        "r": "0x28ef61340bd939bc2195fe537567866003e1a15d3c71ff63e1590620aa636276",
        "s": "0x67cbe9d8997f761aecb703304b3800ccf555c9f3dc64214b297fb1966a3b6d83"
    })
}

/// Contract creation: no recipient, and no signature fields, as some
/// nodes serve system transactions.
pub fn deployment(hash: &str) -> Value {
    json!({
        "hash": hash,
        "nonce": "0x0",
        "to": null,
        "value": "0x0",
        "gas": "0x186a0",
        "gasPrice": "0x3b9aca00",
        "input": "0x6080604052"
    })
}

pub fn block_with(number: u64, transactions: Vec<Value>) -> Value {
    json!({
        "number": format!("0x{number:x}"),
        "hash": tx_hash(number + 0xb10c),
        "timestamp": "0x6553f100",
        "transactions": transactions
    })
}

pub fn receipt(hash: &str, gas_used: u64, success: bool) -> Value {
    json!({
        "transactionHash": hash,
        "status": if success { "0x1" } else { "0x0" },
        "gasUsed": format!("0x{gas_used:x}")
    })
}
