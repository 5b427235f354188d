//! Benchmarks for the ABI codec.
//!
//! Pure in-memory encoding/decoding, no node required.
//! Run with: `cargo bench --package xray-abi`

use alloy::primitives::{Address, U256};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use xray_abi::{decode_as, encode_indexed_call, encode_return, selector, AbiType, AbiValue};

/// Selector derivation for a short getter name.
fn bench_selector(c: &mut Criterion) {
    c.bench_function("selector_total_supply", |b| {
        b.iter(|| selector(black_box("totalSupply"), black_box(&[] as &[AbiType])));
    });
}

/// Indexed-list payload construction, 1,000 indices.
fn bench_indexed_call(c: &mut Criterion) {
    c.bench_function("encode_indexed_call_1k", |b| {
        b.iter(|| {
            for i in 0..1_000u64 {
                let _ = encode_indexed_call(black_box("allPairs"), black_box(U256::from(i)));
            }
        });
    });
}

/// Decoding an `address[]` of 256 entries.
fn bench_decode_address_array(c: &mut Criterion) {
    let ty = AbiType::Array(Box::new(AbiType::Address));
    let value = AbiValue::Array(
        (0..=255u8)
            .map(|i| AbiValue::Address(Address::repeat_byte(i)))
            .collect(),
    );
    let raw = encode_return(&value, &ty).unwrap_or_default();

    c.bench_function("decode_address_array_256", |b| {
        b.iter(|| decode_as(black_box(&raw), black_box(&ty)));
    });
}

/// String decoding that misses the dynamic layout and takes the bytes32 path.
fn bench_string_fallback(c: &mut Criterion) {
    let mut raw = vec![0u8; 32];
    raw[..4].copy_from_slice(b"WETH");

    c.bench_function("decode_string_bytes32_fallback", |b| {
        b.iter(|| decode_as(black_box(&raw), black_box(&AbiType::String)));
    });
}

criterion_group!(
    benches,
    bench_selector,
    bench_indexed_call,
    bench_decode_address_array,
    bench_string_fallback
);
criterion_main!(benches);
