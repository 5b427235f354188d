//! JSON row for one annotated transaction.
//!
//! Money is rendered as fixed 8-decimal strings so that no precision is lost
//! to JSON number handling: `gas_price` in gwei, everything else in ether.

use alloy::primitives::U512;
use serde::{Deserialize, Serialize};
use xray_data::units::{format_ether, format_gwei, format_units, DISPLAY_PRECISION, WEI_DECIMALS};

use crate::analyzer::AnnotatedTransaction;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: usize,
    pub success: bool,
    pub hash: String,
    pub gas_price: String,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub gas_cost: String,
    pub max_gas_cost: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub value: String,
    pub data_length: usize,
    pub rating: u64,
}

fn ether_512(wei: U512) -> String {
    format_units(wei, WEI_DECIMALS, DISPLAY_PRECISION)
}

impl From<&AnnotatedTransaction> for TransactionRecord {
    fn from(annotated: &AnnotatedTransaction) -> Self {
        let tx = &annotated.tx;
        Self {
            id: annotated.index,
            success: tx.success,
            hash: format!("{:#x}", tx.hash),
            gas_price: format_gwei(tx.gas_price),
            gas_limit: tx.gas_limit,
            gas_used: tx.gas_used,
            gas_cost: ether_512(annotated.gas_cost),
            max_gas_cost: ether_512(annotated.max_gas_cost),
            from: tx.from.map(|address| address.to_checksum(None)),
            to: tx.to.map(|address| address.to_checksum(None)),
            value: format_ether(tx.value),
            data_length: tx.data_length,
            rating: annotated.rating,
        }
    }
}

pub fn records(transactions: &[AnnotatedTransaction]) -> Vec<TransactionRecord> {
    transactions.iter().map(TransactionRecord::from).collect()
}
