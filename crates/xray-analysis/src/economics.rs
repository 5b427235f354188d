//! Per-transaction cost and rating metrics.
//!
//! Costs are computed in 512 bits: the product of a 64-bit gas amount and a
//! 256-bit price cannot overflow.

use alloy::primitives::{U256, U512};
use std::num::NonZeroU64;

use crate::analyzer::AnnotatedTransaction;

/// Gas of a plain value transfer.
pub const BASE_TX_GAS: NonZeroU64 = match NonZeroU64::new(21_000) {
    Some(gas) => gas,
    None => panic!("base gas is non-zero"),
};

pub const DEFAULT_RATING_DIVISOR: NonZeroU64 = match NonZeroU64::new(5) {
    Some(divisor) => divisor,
    None => panic!("divisor is non-zero"),
};

/// Coarse heaviness score: `gas_used / base_gas / divisor`, floored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RatingPolicy {
    pub base_gas: NonZeroU64,
    pub divisor: NonZeroU64,
}

impl Default for RatingPolicy {
    fn default() -> Self {
        Self {
            base_gas: BASE_TX_GAS,
            divisor: DEFAULT_RATING_DIVISOR,
        }
    }
}

impl RatingPolicy {
    pub fn new(base_gas: NonZeroU64, divisor: NonZeroU64) -> Self {
        Self { base_gas, divisor }
    }

    pub fn rating(&self, gas_used: u64) -> u64 {
        gas_used / self.base_gas.get() / self.divisor.get()
    }
}

/// Fee actually charged: `gas_used * gas_price` wei.
pub fn gas_cost(gas_used: u64, gas_price: U256) -> U512 {
    U512::from(gas_used) * U512::from(gas_price)
}

/// Upper bound the sender committed to: `gas_limit * gas_price` wei.
pub fn max_gas_cost(gas_limit: u64, gas_price: U256) -> U512 {
    U512::from(gas_limit) * U512::from(gas_price)
}

/// Block-level totals over annotated transactions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockSummary {
    pub tx_count: usize,
    pub failed_count: usize,
    pub total_gas_used: u64,
    /// Sum of `gas_cost` in wei.
    pub total_gas_cost: U512,
    pub max_rating: u64,
}

impl BlockSummary {
    pub fn from_transactions(transactions: &[AnnotatedTransaction]) -> Self {
        transactions.iter().fold(Self::default(), |mut summary, annotated| {
            summary.tx_count += 1;
            if !annotated.tx.success {
                summary.failed_count += 1;
            }
            summary.total_gas_used = summary.total_gas_used.saturating_add(annotated.tx.gas_used);
            summary.total_gas_cost = summary.total_gas_cost.saturating_add(annotated.gas_cost);
            summary.max_rating = summary.max_rating.max(annotated.rating);
            summary
        })
    }
}
