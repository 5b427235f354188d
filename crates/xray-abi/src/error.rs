use thiserror::Error;
use xray_data::{ErrorKind, NodeError};

/// Failure to build a call payload or to interpret its result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("ABI type `{0}` is not supported")]
    TypeNotSupported(String),
    #[error("encode error: {0}")]
    Encode(String),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Failure of a contract read: building the call, running it, or reading
/// the result.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error(transparent)]
    Abi(#[from] AbiError),
    #[error(transparent)]
    Node(#[from] NodeError),
    #[error("expected {expected}, decoded {found}")]
    UnexpectedValue {
        expected: &'static str,
        found: String,
    },
}

impl ReadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Abi(_) | Self::UnexpectedValue { .. } => ErrorKind::InvalidInput,
            Self::Node(err) => err.kind(),
        }
    }
}
