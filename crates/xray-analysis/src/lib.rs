//! Block transaction economics: receipt join, sender recovery, cost and
//! rating, and the JSON rendering of the result.

pub mod analyzer;
pub mod economics;
pub mod record;

pub use analyzer::{AnalyzerConfig, AnnotatedTransaction, BlockAnalyzer};
pub use economics::{gas_cost, max_gas_cost, BlockSummary, RatingPolicy};
pub use record::{records, TransactionRecord};
