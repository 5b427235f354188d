//! Block height -> ordered, annotated transactions.
//!
//! The block and every receipt must resolve; the first failure aborts the
//! whole block and nothing partial is returned. Sender recovery is
//! best-effort.

use alloy::primitives::U512;
use futures::{StreamExt, TryStreamExt};
use xray_data::types::parse_b256;
use xray_data::{ChainSigner, NodeClient, NodeError, RpcReceipt, Transaction, MAINNET_CHAIN_ID};

use crate::economics::{gas_cost, max_gas_cost, RatingPolicy};

/// Receipts requested at once per block.
pub const DEFAULT_RECEIPT_CONCURRENCY: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnalyzerConfig {
    /// Chain id the sender signer expects.
    pub chain_id: u64,
    pub rating: RatingPolicy,
    /// Upper bound on in-flight receipt requests; `0` is treated as `1`.
    pub receipt_concurrency: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            chain_id: MAINNET_CHAIN_ID,
            rating: RatingPolicy::default(),
            receipt_concurrency: DEFAULT_RECEIPT_CONCURRENCY,
        }
    }
}

/// A transaction with its derived economics.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotatedTransaction {
    /// Position in the block.
    pub index: usize,
    pub tx: Transaction,
    /// `gas_used * gas_price` in wei.
    pub gas_cost: U512,
    /// `gas_limit * gas_price` in wei.
    pub max_gas_cost: U512,
    pub rating: u64,
}

impl AnnotatedTransaction {
    pub fn new(index: usize, tx: Transaction, policy: &RatingPolicy) -> Self {
        Self {
            index,
            gas_cost: gas_cost(tx.gas_used, tx.gas_price),
            max_gas_cost: max_gas_cost(tx.gas_limit, tx.gas_price),
            rating: policy.rating(tx.gas_used),
            tx,
        }
    }
}

#[derive(Clone, Debug)]
pub struct BlockAnalyzer {
    node: NodeClient,
    signer: ChainSigner,
    config: AnalyzerConfig,
}

impl BlockAnalyzer {
    pub fn new(node: NodeClient, config: AnalyzerConfig) -> Self {
        Self {
            node,
            signer: ChainSigner::new(config.chain_id),
            config,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Fetches block `block_number` with every receipt and annotates each
    /// transaction, in block order.
    ///
    /// # Errors
    /// Returns the first [`NodeError`] hit while fetching the block or any
    /// receipt, or while validating the joined data.
    #[tracing::instrument(skip(self), fields(tx_count))]
    pub async fn analyze_block(
        &self,
        block_number: u64,
    ) -> Result<Vec<AnnotatedTransaction>, NodeError> {
        let block = self.node.get_block(block_number).await?;
        tracing::Span::current().record("tx_count", block.transactions.len());

        let hashes = block
            .transactions
            .iter()
            .map(|tx| {
                parse_b256(&tx.hash).map_err(|message| NodeError::InvalidResponse {
                    method: "eth_getBlockByNumber",
                    message,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let receipts: Vec<RpcReceipt> = futures::stream::iter(hashes)
            .map(|hash| self.node.get_receipt(hash))
            .buffered(self.config.receipt_concurrency.max(1))
            .try_collect()
            .await?;

        let annotated = block
            .transactions
            .iter()
            .zip(&receipts)
            .enumerate()
            .map(|(index, (raw, receipt))| {
                let from = match self.signer.recover(raw) {
                    Ok(sender) => Some(sender),
                    Err(err) => {
                        tracing::debug!(tx = %raw.hash, error = %err, "sender recovery failed");
                        None
                    }
                };
                let tx = Transaction::from_rpc(raw, receipt, from)?;
                Ok(AnnotatedTransaction::new(index, tx, &self.config.rating))
            })
            .collect::<Result<Vec<_>, NodeError>>()?;

        tracing::info!(block_number, tx_count = annotated.len(), "block analyzed");
        Ok(annotated)
    }
}
