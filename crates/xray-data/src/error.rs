//! Error types for node round-trips and value conversion.

use alloy::primitives::B256;
use thiserror::Error;

/// Coarse error category, used by outer layers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The node could not be reached or did not answer in time.
    Upstream,
    /// The node answered with a JSON-RPC error (e.g. a reverted call).
    NodeRpc,
    /// The requested block, receipt or transaction does not (yet) exist.
    NotFound,
    /// The caller supplied an unsupported or malformed request shape.
    InvalidInput,
}

/// Failure of a single JSON-RPC round-trip.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("{method}: failed to connect to node: {source}")]
    Connect {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method}: node did not answer within the deadline")]
    Timeout { method: &'static str },

    #[error("{method}: transport failure: {message}")]
    Transport {
        method: &'static str,
        message: String,
    },

    #[error("{method}: node error {code}: {message}")]
    Rpc {
        method: &'static str,
        code: i64,
        message: String,
    },

    #[error("{method}: invalid response: {message}")]
    InvalidResponse {
        method: &'static str,
        message: String,
    },

    #[error("invalid node URL `{url}`: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("block {0} not found")]
    BlockNotFound(u64),

    #[error("receipt for transaction {0} not found")]
    ReceiptNotFound(B256),

    #[error("transaction {0} not found")]
    TransactionNotFound(B256),
}

impl NodeError {
    /// Maps a `reqwest` failure onto the transport variants.
    pub(crate) fn from_reqwest(method: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { method }
        } else if err.is_connect() {
            Self::Connect {
                method,
                source: err,
            }
        } else {
            Self::Transport {
                method,
                message: err.to_string(),
            }
        }
    }

    pub(crate) fn invalid(method: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            method,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connect { .. }
            | Self::Timeout { .. }
            | Self::Transport { .. }
            | Self::InvalidResponse { .. } => ErrorKind::Upstream,
            Self::Rpc { .. } => ErrorKind::NodeRpc,
            Self::InvalidUrl { .. } => ErrorKind::InvalidInput,
            Self::BlockNotFound(_) | Self::ReceiptNotFound(_) | Self::TransactionNotFound(_) => {
                ErrorKind::NotFound
            }
        }
    }
}

/// Decimal string could not be turned into base units.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UnitsError {
    #[error("empty amount")]
    Empty,
    #[error("invalid decimal amount: {0}")]
    Invalid(String),
    #[error("amount does not fit in 256 bits: {0}")]
    Overflow(String),
}

/// Sender could not be recovered from a transaction signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    #[error("transaction type {0:#x} is not supported by the chain signer")]
    UnsupportedType(u8),
    #[error("chain id mismatch: signer expects {expected}, transaction carries {actual}")]
    ChainIdMismatch { expected: u64, actual: u64 },
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
    #[error("malformed transaction field `{field}`: {message}")]
    Malformed {
        field: &'static str,
        message: String,
    },
}
