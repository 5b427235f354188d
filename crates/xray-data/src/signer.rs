//! Sender recovery for legacy transactions under a fixed chain id.
//!
//! Follows EIP-155: a `v` of `chain_id * 2 + 35/36` is replay-protected and
//! hashed with the chain id; `v` of 27/28 is an unprotected (pre-EIP-155)
//! signature. Typed transactions are rejected, matching a signer that only
//! knows the legacy envelope.

use alloy::consensus::{SignableTransaction, TxLegacy};
use alloy::primitives::{Address, PrimitiveSignature, TxKind};

use crate::error::SignerError;
use crate::types::{parse_address, parse_bytes, parse_quantity_u256, parse_quantity_u64, RpcTransaction};

/// Ethereum mainnet.
pub const MAINNET_CHAIN_ID: u64 = 1;

/// Recovers transaction senders for one network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChainSigner {
    chain_id: u64,
}

impl Default for ChainSigner {
    fn default() -> Self {
        Self::new(MAINNET_CHAIN_ID)
    }
}

fn malformed(field: &'static str) -> impl FnOnce(String) -> SignerError {
    move |message| SignerError::Malformed { field, message }
}

fn required<'a>(field: &'static str, value: Option<&'a str>) -> Result<&'a str, SignerError> {
    value.ok_or_else(|| SignerError::Malformed {
        field,
        message: "missing".to_string(),
    })
}

impl ChainSigner {
    pub fn new(chain_id: u64) -> Self {
        Self { chain_id }
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// Recovers the address that signed `tx`.
    ///
    /// # Errors
    /// Returns [`SignerError`] for typed transactions, foreign chain ids,
    /// malformed fields or signatures that do not recover.
    pub fn recover(&self, tx: &RpcTransaction) -> Result<Address, SignerError> {
        let tx_type = tx
            .tx_type
            .as_deref()
            .map(parse_quantity_u64)
            .transpose()
            .map_err(malformed("type"))?
            .unwrap_or(0);
        if tx_type != 0 {
            return Err(SignerError::UnsupportedType(
                u8::try_from(tx_type).unwrap_or(u8::MAX),
            ));
        }

        let v = parse_quantity_u64(required("v", tx.v.as_deref())?).map_err(malformed("v"))?;
        let (chain_id, y_parity) = match v {
            27 | 28 => (None, v == 28),
            v if v >= 35 => {
                let actual = (v - 35) / 2;
                if actual != self.chain_id {
                    return Err(SignerError::ChainIdMismatch {
                        expected: self.chain_id,
                        actual,
                    });
                }
                (Some(actual), (v - 35) % 2 == 1)
            }
            other => {
                return Err(SignerError::InvalidSignature(format!(
                    "unexpected v value {other}"
                )))
            }
        };

        let gas_price = parse_quantity_u256(tx.gas_price.as_deref().unwrap_or("0x0"))
            .map_err(malformed("gasPrice"))?;
        let unsigned = TxLegacy {
            chain_id,
            nonce: parse_quantity_u64(&tx.nonce).map_err(malformed("nonce"))?,
            gas_price: u128::try_from(gas_price)
                .map_err(|e| SignerError::Malformed {
                    field: "gasPrice",
                    message: e.to_string(),
                })?,
            gas_limit: parse_quantity_u64(&tx.gas).map_err(malformed("gas"))?,
            to: match tx.to.as_deref() {
                Some(to) => TxKind::Call(parse_address(to).map_err(malformed("to"))?),
                None => TxKind::Create,
            },
            value: parse_quantity_u256(&tx.value).map_err(malformed("value"))?,
            input: parse_bytes(&tx.input).map_err(malformed("input"))?,
        };

        let signature = PrimitiveSignature::new(
            parse_quantity_u256(required("r", tx.r.as_deref())?).map_err(malformed("r"))?,
            parse_quantity_u256(required("s", tx.s.as_deref())?).map_err(malformed("s"))?,
            y_parity,
        );

        signature
            .recover_address_from_prehash(&unsigned.signature_hash())
            .map_err(|e| SignerError::InvalidSignature(e.to_string()))
    }
}
