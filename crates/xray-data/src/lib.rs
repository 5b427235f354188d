//! Node access for etherxray: JSON-RPC client, wire types, sender recovery
//! and unit conversion.

pub mod error;
pub mod node;
pub mod signer;
pub mod types;
pub mod units;

pub use error::{ErrorKind, NodeError, SignerError, UnitsError};
pub use node::{NodeClient, NodeConfig, DEFAULT_TIMEOUT};
pub use signer::{ChainSigner, MAINNET_CHAIN_ID};
pub use types::{LogFilter, RpcBlock, RpcLog, RpcReceipt, RpcTransaction, Transaction};
