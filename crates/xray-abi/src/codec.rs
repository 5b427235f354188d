//! Call payload encoding and return-data decoding.
//!
//! Head/tail layout is handled by `alloy`'s dynamic ABI types. Around it this
//! module keeps the closed type catalogue strict: integer widths, `bool`,
//! `address` and `bytesN` padding are checked on every decoded word, and the
//! lengths a payload claims are added up before anything is materialised.

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::{hex, Address, Bytes, B256, I256, U256};
use serde_json::Value;
use std::fmt;

use crate::error::AbiError;
use crate::registry::{selector, AbiType};

const WORD: usize = 32;

/// A decoded ABI value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbiValue {
    Uint(U256),
    Int(I256),
    Bool(bool),
    Address(Address),
    /// `bytesN` contents, exactly `N` bytes.
    FixedBytes(Bytes),
    Bytes(Bytes),
    String(String),
    Array(Vec<AbiValue>),
}

impl AbiValue {
    /// JSON rendering: integers as decimal strings, addresses checksummed,
    /// byte strings as `0x` hex.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Uint(v) => Value::String(v.to_string()),
            Self::Int(v) => Value::String(v.to_string()),
            Self::Bool(v) => Value::Bool(*v),
            Self::Address(v) => Value::String(v.to_checksum(None)),
            Self::FixedBytes(v) | Self::Bytes(v) => Value::String(hex::encode_prefixed(v)),
            Self::String(v) => Value::String(v.clone()),
            Self::Array(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

impl fmt::Display for AbiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Address(v) => f.write_str(&v.to_checksum(None)),
            Self::FixedBytes(v) | Self::Bytes(v) => f.write_str(&hex::encode_prefixed(v)),
            Self::String(v) => f.write_str(v),
            Self::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

/// One contract read: a zero-argument getter or a `uint256`-indexed list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallSpec {
    pub contract: Address,
    pub field: String,
    pub index: Option<U256>,
    pub returns: AbiType,
}

impl CallSpec {
    pub fn field(contract: Address, field: impl Into<String>, returns: AbiType) -> Self {
        Self {
            contract,
            field: field.into(),
            index: None,
            returns,
        }
    }

    pub fn indexed(contract: Address, map: impl Into<String>, index: U256, returns: AbiType) -> Self {
        Self {
            contract,
            field: map.into(),
            index: Some(index),
            returns,
        }
    }

    pub fn encode(&self) -> Result<Bytes, AbiError> {
        match self.index {
            Some(index) => encode_indexed_call(&self.field, index),
            None => encode_zero_arg_call(&self.field),
        }
    }

    pub fn decode(&self, raw: &[u8]) -> Result<AbiValue, AbiError> {
        decode_as(raw, &self.returns)
    }
}

fn check_function_name(name: &str) -> Result<(), AbiError> {
    let valid_start = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$');
    if valid_start && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$') {
        Ok(())
    } else {
        Err(AbiError::Encode(format!("`{name}` is not a valid function name")))
    }
}

/// Payload for `field()`: the bare selector.
pub fn encode_zero_arg_call(field: &str) -> Result<Bytes, AbiError> {
    check_function_name(field)?;
    Ok(Bytes::copy_from_slice(selector(field, &[]).as_slice()))
}

/// Payload for `map(uint256)` with `index` as the single argument.
pub fn encode_indexed_call(map: &str, index: U256) -> Result<Bytes, AbiError> {
    check_function_name(map)?;
    let mut payload = Vec::with_capacity(4 + WORD);
    payload.extend_from_slice(selector(map, &[AbiType::Uint(256)]).as_slice());
    payload.extend_from_slice(&index.to_be_bytes::<WORD>());
    Ok(payload.into())
}

/// Parses a caller-supplied list index (base 10).
pub fn parse_index(index: &str) -> Result<U256, AbiError> {
    let index = index.trim();
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AbiError::Encode(format!(
            "index `{index}` is not a non-negative integer"
        )));
    }
    U256::from_str_radix(index, 10)
        .map_err(|_| AbiError::Encode(format!("index `{index}` does not fit in 256 bits")))
}

fn mismatch(value: &AbiValue, ty: &AbiType) -> AbiError {
    AbiError::Encode(format!("value `{value}` does not fit type `{ty}`"))
}

fn fits_uint(value: U256, bits: u16) -> bool {
    value.bit_len() <= usize::from(bits)
}

/// Bits above the sign bit must all equal the sign bit.
fn fits_int(raw: U256, bits: u16) -> bool {
    if bits >= 256 {
        return true;
    }
    let high = U256::MAX << (usize::from(bits) - 1);
    let top = raw & high;
    top == U256::ZERO || top == high
}

fn to_sol(value: &AbiValue, ty: &AbiType) -> Result<DynSolValue, AbiError> {
    let sol = match (ty, value) {
        (AbiType::Uint(bits), AbiValue::Uint(v)) if fits_uint(*v, *bits) => {
            DynSolValue::Uint(*v, usize::from(*bits))
        }
        (AbiType::Int(bits), AbiValue::Int(v)) if fits_int(v.into_raw(), *bits) => {
            DynSolValue::Int(*v, usize::from(*bits))
        }
        (AbiType::Bool, AbiValue::Bool(v)) => DynSolValue::Bool(*v),
        (AbiType::Address, AbiValue::Address(v)) => DynSolValue::Address(*v),
        (AbiType::FixedBytes(size), AbiValue::FixedBytes(v))
            if v.len() == usize::from(*size) && v.len() <= WORD =>
        {
            DynSolValue::FixedBytes(B256::right_padding_from(v), v.len())
        }
        (AbiType::Bytes, AbiValue::Bytes(v)) => DynSolValue::Bytes(v.to_vec()),
        (AbiType::String, AbiValue::String(v)) => DynSolValue::String(v.clone()),
        (AbiType::Array(inner), AbiValue::Array(items)) => DynSolValue::Array(
            items
                .iter()
                .map(|item| to_sol(item, inner))
                .collect::<Result<_, _>>()?,
        ),
        _ => return Err(mismatch(value, ty)),
    };
    Ok(sol)
}

/// Shape handed to the decoder. Scalars are read as whole 256-bit words so
/// that their unused bits can be checked in [`from_sol`].
fn layout_type(ty: &AbiType) -> DynSolType {
    match ty {
        AbiType::Uint(_) | AbiType::Bool | AbiType::Address => DynSolType::Uint(256),
        AbiType::Int(_) => DynSolType::Int(256),
        AbiType::FixedBytes(_) => DynSolType::FixedBytes(WORD),
        AbiType::Bytes => DynSolType::Bytes,
        AbiType::String => DynSolType::String,
        AbiType::Array(inner) => DynSolType::Array(Box::new(layout_type(inner))),
    }
}

fn from_sol(value: DynSolValue, ty: &AbiType) -> Result<AbiValue, AbiError> {
    let invalid = || AbiError::Decode(format!("result is not a valid `{ty}`"));

    match (ty, value) {
        (AbiType::Uint(bits), DynSolValue::Uint(v, _)) if fits_uint(v, *bits) => {
            Ok(AbiValue::Uint(v))
        }
        (AbiType::Int(bits), DynSolValue::Int(v, _)) if fits_int(v.into_raw(), *bits) => {
            Ok(AbiValue::Int(v))
        }
        (AbiType::Bool, DynSolValue::Uint(v, _)) if v <= U256::from(1u8) => {
            Ok(AbiValue::Bool(v == U256::from(1u8)))
        }
        (AbiType::Address, DynSolValue::Uint(v, _)) if fits_uint(v, 160) => Ok(AbiValue::Address(
            Address::from_slice(&v.to_be_bytes::<WORD>()[12..]),
        )),
        (AbiType::FixedBytes(size), DynSolValue::FixedBytes(word, _)) => {
            let (value, padding) = word.as_slice().split_at(usize::from(*size).min(WORD));
            if padding.iter().any(|b| *b != 0) {
                return Err(invalid());
            }
            Ok(AbiValue::FixedBytes(Bytes::copy_from_slice(value)))
        }
        (AbiType::Bytes, DynSolValue::Bytes(v)) => Ok(AbiValue::Bytes(v.into())),
        (AbiType::String, DynSolValue::String(v)) => Ok(AbiValue::String(v)),
        (AbiType::Array(inner), DynSolValue::Array(items)) => items
            .into_iter()
            .map(|item| from_sol(item, inner))
            .collect::<Result<_, _>>()
            .map(AbiValue::Array),
        _ => Err(invalid()),
    }
}

/// ABI-encodes `values` as a tuple of `types`.
pub fn encode_params(values: &[AbiValue], types: &[AbiType]) -> Result<Vec<u8>, AbiError> {
    if values.len() != types.len() {
        return Err(AbiError::Encode(format!(
            "{} values for {} types",
            values.len(),
            types.len()
        )));
    }
    let tuple = values
        .iter()
        .zip(types)
        .map(|(value, ty)| to_sol(value, ty))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DynSolValue::Tuple(tuple).abi_encode_params())
}

/// Encodes `value` the way a contract returns a single value of type `ty`.
pub fn encode_return(value: &AbiValue, ty: &AbiType) -> Result<Vec<u8>, AbiError> {
    encode_params(std::slice::from_ref(value), std::slice::from_ref(ty))
}

/// Reads an offset or length word that must not exceed `data.len()`.
fn read_bounded(data: &[u8], pos: usize) -> Result<usize, AbiError> {
    let word = pos
        .checked_add(WORD)
        .and_then(|end| data.get(pos..end))
        .ok_or_else(|| AbiError::Decode(format!("result too short: {} bytes", data.len())))?;
    let value = U256::from_be_slice(word);
    if value > U256::from(data.len()) {
        return Err(AbiError::Decode(format!(
            "offset or length exceeds result of {} bytes",
            data.len()
        )));
    }
    usize::try_from(value.as_limbs()[0]).map_err(|e| AbiError::Decode(e.to_string()))
}

/// Bytes that decoding `types` from `data` would materialise, summed from
/// the offsets and lengths the payload claims. Every reference is counted,
/// so elements aliasing one tail cannot exceed the payload they came from.
fn claimed_size<'t>(
    data: &[u8],
    types: impl Iterator<Item = &'t AbiType>,
) -> Result<usize, AbiError> {
    let over = || {
        AbiError::Decode(format!(
            "encoded lengths exceed result of {} bytes",
            data.len()
        ))
    };

    let mut total = 0usize;
    for (i, ty) in types.enumerate() {
        let head = i.checked_mul(WORD).ok_or_else(over)?;
        total = total.checked_add(WORD).ok_or_else(over)?;
        if ty.is_dynamic() {
            let offset = read_bounded(data, head)?;
            total = total
                .checked_add(tail_size(&data[offset..], ty)?)
                .ok_or_else(over)?;
        }
        if total > data.len() {
            return Err(over());
        }
    }
    Ok(total)
}

fn tail_size(data: &[u8], ty: &AbiType) -> Result<usize, AbiError> {
    let len = read_bounded(data, 0)?;
    match ty {
        AbiType::Array(inner) => {
            let elements = claimed_size(&data[WORD..], std::iter::repeat(inner.as_ref()).take(len))?;
            Ok(WORD + elements)
        }
        _ => Ok(WORD + len.div_ceil(WORD) * WORD),
    }
}

/// Decodes a multi-value return tuple.
pub fn decode_params(raw: &[u8], types: &[AbiType]) -> Result<Vec<AbiValue>, AbiError> {
    claimed_size(raw, types.iter())?;

    let layout = DynSolType::Tuple(types.iter().map(layout_type).collect());
    let decoded = layout
        .abi_decode_params(raw)
        .map_err(|e| AbiError::Decode(e.to_string()))?;

    match decoded {
        DynSolValue::Tuple(values) if values.len() == types.len() => values
            .into_iter()
            .zip(types)
            .map(|(value, ty)| from_sol(value, ty))
            .collect(),
        _ => Err(AbiError::Decode(format!(
            "expected a tuple of {} values",
            types.len()
        ))),
    }
}

fn decode_single(raw: &[u8], ty: &AbiType) -> Result<AbiValue, AbiError> {
    decode_params(raw, std::slice::from_ref(ty))?
        .pop()
        .ok_or_else(|| AbiError::Decode("empty result".to_string()))
}

/// Some tokens return `bytes32` where `string` is declared; the first word is
/// then read as zero-padded text.
fn decode_string(raw: &[u8]) -> Result<String, AbiError> {
    let dynamic_err = match decode_single(raw, &AbiType::String) {
        Ok(AbiValue::String(text)) => return Ok(text.trim().to_string()),
        Ok(other) => AbiError::Decode(format!("expected string, decoded {other}")),
        Err(err) => err,
    };

    let word = raw.get(..WORD).ok_or_else(|| {
        AbiError::Decode(format!(
            "{dynamic_err}; {} bytes is too short for a bytes32 string",
            raw.len()
        ))
    })?;
    let end = word.iter().rposition(|b| *b != 0).map_or(0, |last| last + 1);
    std::str::from_utf8(&word[..end])
        .map(|text| text.trim().to_string())
        .map_err(|e| AbiError::Decode(format!("{dynamic_err}; bytes32 is not UTF-8: {e}")))
}

/// Decodes a single return value of type `ty`.
///
/// `string` results fall back to a zero-padded `bytes32` reading when the
/// payload is not a valid dynamic string, and are whitespace-trimmed.
pub fn decode_as(raw: &[u8], ty: &AbiType) -> Result<AbiValue, AbiError> {
    match ty {
        AbiType::String => decode_string(raw).map(AbiValue::String),
        _ => decode_single(raw, ty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    fn word(value: u64) -> Vec<u8> {
        U256::from(value).to_be_bytes::<WORD>().to_vec()
    }

    #[test]
    fn zero_arg_call_is_bare_selector() {
        let payload = encode_zero_arg_call("totalSupply").expect("valid name");
        assert_eq!(payload.as_ref(), &[0x18, 0x16, 0x0d, 0xdd]);
    }

    #[test]
    fn indexed_call_appends_big_endian_index() {
        let payload = encode_indexed_call("allPairs", U256::from(3u8)).expect("valid name");
        assert_eq!(payload.len(), 36);
        assert_eq!(&payload[..4], &[0x1e, 0x3d, 0xd1, 0x8b]);
        assert_eq!(&payload[4..], word(3).as_slice());
    }

    #[test]
    fn rejects_invalid_function_names() {
        for name in ["", "1abc", "balanceOf(address)", "a b"] {
            assert!(matches!(encode_zero_arg_call(name), Err(AbiError::Encode(_))), "{name}");
        }
    }

    #[test]
    fn parse_index_accepts_only_u256_decimals() {
        assert_eq!(parse_index("42"), Ok(U256::from(42u8)));
        assert_eq!(parse_index(&U256::MAX.to_string()), Ok(U256::MAX));
        for bad in ["", "-1", "0x10", "1.5", "abc"] {
            assert!(matches!(parse_index(bad), Err(AbiError::Encode(_))), "{bad}");
        }
        let too_big = format!("{}0", U256::MAX);
        assert!(matches!(parse_index(&too_big), Err(AbiError::Encode(_))));
    }

    #[test]
    fn scalar_values_round_trip() {
        let cases = [
            (AbiValue::Uint(U256::from(255u8)), AbiType::Uint(8)),
            (AbiValue::Uint(U256::from(u64::MAX)), AbiType::Uint(64)),
            (AbiValue::Uint(U256::MAX), AbiType::Uint(256)),
            (AbiValue::Int(I256::MINUS_ONE), AbiType::Int(8)),
            (AbiValue::Int("-128".parse::<I256>().unwrap()), AbiType::Int(8)),
            (AbiValue::Int("127".parse::<I256>().unwrap()), AbiType::Int(8)),
            (AbiValue::Bool(true), AbiType::Bool),
            (AbiValue::Bool(false), AbiType::Bool),
            (
                AbiValue::Address(address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2")),
                AbiType::Address,
            ),
            (AbiValue::FixedBytes(Bytes::from_static(&[0xab])), AbiType::FixedBytes(1)),
            (AbiValue::FixedBytes(Bytes::from(vec![7u8; 32])), AbiType::FixedBytes(32)),
            (AbiValue::Bytes(Bytes::from_static(b"\x00\x01\x02")), AbiType::Bytes),
            (AbiValue::String("Wrapped Ether".to_string()), AbiType::String),
        ];

        for (value, ty) in cases {
            let raw = encode_return(&value, &ty).expect("encodable");
            assert_eq!(decode_as(&raw, &ty), Ok(value), "{ty}");
        }
    }

    #[test]
    fn address_array_round_trips() {
        let ty = AbiType::Array(Box::new(AbiType::Address));
        let value = AbiValue::Array(vec![
            AbiValue::Address(Address::repeat_byte(0x11)),
            AbiValue::Address(Address::repeat_byte(0x22)),
        ]);

        let raw = encode_return(&value, &ty).expect("encodable");
        assert_eq!(raw.len(), 4 * WORD);
        assert_eq!(&raw[..WORD], word(32).as_slice());
        assert_eq!(&raw[WORD..2 * WORD], word(2).as_slice());
        assert_eq!(decode_as(&raw, &ty), Ok(value));
    }

    #[test]
    fn string_array_round_trips() {
        let ty = AbiType::Array(Box::new(AbiType::String));
        let value = AbiValue::Array(vec![
            AbiValue::String("a".to_string()),
            AbiValue::String("longer than one word, to force padding".to_string()),
        ]);
        let raw = encode_return(&value, &ty).expect("encodable");
        assert_eq!(decode_as(&raw, &ty), Ok(value));
    }

    #[test]
    fn encode_rejects_out_of_range_values() {
        let too_wide = encode_return(&AbiValue::Uint(U256::from(256u16)), &AbiType::Uint(8));
        assert!(matches!(too_wide, Err(AbiError::Encode(_))));

        let too_small = encode_return(
            &AbiValue::Int("-129".parse::<I256>().unwrap()),
            &AbiType::Int(8),
        );
        assert!(matches!(too_small, Err(AbiError::Encode(_))));

        let wrong_kind = encode_return(&AbiValue::Bool(true), &AbiType::Address);
        assert!(matches!(wrong_kind, Err(AbiError::Encode(_))));
    }

    #[test]
    fn bytes32_string_falls_back_to_padded_text() {
        let mut raw = vec![0u8; WORD];
        raw[..3].copy_from_slice(b"ABC");
        assert_eq!(
            decode_as(&raw, &AbiType::String),
            Ok(AbiValue::String("ABC".to_string()))
        );
    }

    #[test]
    fn decoded_strings_are_trimmed() {
        let raw = encode_return(&AbiValue::String("  MKR \n".to_string()), &AbiType::String)
            .expect("encodable");
        assert_eq!(
            decode_as(&raw, &AbiType::String),
            Ok(AbiValue::String("MKR".to_string()))
        );
    }

    #[test]
    fn exhausted_string_fallback_is_a_decode_error() {
        assert!(matches!(decode_as(&[], &AbiType::String), Err(AbiError::Decode(_))));

        let mut raw = vec![0u8; WORD];
        raw[0] = 0xff;
        raw[1] = 0xfe;
        assert!(matches!(decode_as(&raw, &AbiType::String), Err(AbiError::Decode(_))));
    }

    #[test]
    fn strict_word_checks() {
        let mut dirty_address = word(1);
        dirty_address[0] = 1;
        assert!(decode_as(&dirty_address, &AbiType::Address).is_err());
        assert!(decode_as(&word(2), &AbiType::Bool).is_err());
        assert!(decode_as(&word(256), &AbiType::Uint(8)).is_err());
        assert!(decode_as(&word(128), &AbiType::Int(8)).is_err());
        assert!(decode_as(&word(1), &AbiType::FixedBytes(1)).is_err());
        assert!(decode_as(&word(1)[..31], &AbiType::Uint(256)).is_err());
    }

    #[test]
    fn hostile_lengths_are_rejected_without_allocating() {
        let mut raw = word(32);
        raw.extend(U256::MAX.to_be_bytes::<WORD>());
        let array = AbiType::Array(Box::new(AbiType::Address));
        assert!(matches!(decode_as(&raw, &array), Err(AbiError::Decode(_))));

        let mut raw = word(32);
        raw.extend(word(1_000));
        assert!(matches!(decode_as(&raw, &array), Err(AbiError::Decode(_))));
        assert!(matches!(decode_as(&raw, &AbiType::Bytes), Err(AbiError::Decode(_))));

        let bad_offset = word(u64::MAX);
        assert!(matches!(decode_as(&bad_offset, &AbiType::Bytes), Err(AbiError::Decode(_))));
    }

    #[test]
    fn elements_sharing_one_tail_are_rejected() {
        // 64 `bytes` elements, every offset pointing at the same 1 KiB tail.
        let count = 64u64;
        let mut raw = word(32);
        raw.extend(word(count));
        for _ in 0..count {
            raw.extend(word(count * 32));
        }
        raw.extend(word(1_024));
        raw.extend(vec![0xab; 1_024]);

        for ty in [AbiType::Bytes, AbiType::String] {
            let array = AbiType::Array(Box::new(ty));
            assert!(matches!(decode_as(&raw, &array), Err(AbiError::Decode(_))));
        }
    }

    #[test]
    fn canonical_dynamic_arrays_fit_their_payload() {
        let ty = AbiType::Array(Box::new(AbiType::Bytes));
        let value = AbiValue::Array(vec![
            AbiValue::Bytes(Bytes::from(vec![0xab; 1_024])),
            AbiValue::Bytes(Bytes::new()),
            AbiValue::Bytes(Bytes::from_static(b"\x01")),
        ]);
        let raw = encode_return(&value, &ty).expect("encodable");

        assert_eq!(claimed_size(&raw, std::iter::once(&ty)), Ok(raw.len()));
        assert_eq!(decode_as(&raw, &ty), Ok(value));
    }

    #[test]
    fn decodes_multi_value_returns() {
        let types = [AbiType::Uint(112), AbiType::Uint(112), AbiType::Uint(32)];
        let values = vec![
            AbiValue::Uint(U256::from(1_000u64)),
            AbiValue::Uint(U256::from(2_000u64)),
            AbiValue::Uint(U256::from(1_700_000_000u64)),
        ];
        let raw = encode_params(&values, &types).expect("encodable");
        assert_eq!(decode_params(&raw, &types), Ok(values));
        assert!(decode_params(&raw[..64], &types).is_err());
    }

    #[test]
    fn json_rendering() {
        let value = AbiValue::Array(vec![
            AbiValue::Uint(U256::from(10u8)),
            AbiValue::Address(address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2")),
            AbiValue::FixedBytes(Bytes::from_static(&[0xbe, 0xef])),
        ]);
        assert_eq!(
            value.to_json(),
            serde_json::json!(["10", "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", "0xbeef"])
        );
    }
}
