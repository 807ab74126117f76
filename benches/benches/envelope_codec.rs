//! Benchmarks for the envelope codec in kernel/src/envelope.rs
//!
//! Performance-critical paths:
//! - `Envelope::encode_call`: argument serialization plus envelope framing
//! - `Envelope::from_bytes`: envelope parsing and validation
//! - `Decoder::decode`: payload decoding for protobuf and JSON arguments

#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rpcqueue_kernel::proto::{TestRpcRequest, TEST_RPC, TEST_SERVICE};
use rpcqueue_kernel::{Envelope, Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
struct Note {
    message: String,
}

fn message_of(len: usize) -> String {
    "x".repeat(len)
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope_encode");

    for len in [16, 256, 4096] {
        let proto = TestRpcRequest {
            message: message_of(len),
        };
        let json = Json(Note {
            message: message_of(len),
        });
        group.throughput(Throughput::Bytes(len as u64));

        group.bench_with_input(BenchmarkId::new("protobuf", len), &proto, |b, arg| {
            b.iter(|| Envelope::encode_call(TEST_SERVICE, TEST_RPC, black_box(arg)));
        });
        group.bench_with_input(BenchmarkId::new("json", len), &json, |b, arg| {
            b.iter(|| Envelope::encode_call(TEST_SERVICE, TEST_RPC, black_box(arg)));
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope_decode");

    for len in [16, 256, 4096] {
        let request = TestRpcRequest {
            message: message_of(len),
        };
        let Ok(bytes) = Envelope::encode_call(TEST_SERVICE, TEST_RPC, &request) else {
            continue;
        };
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::new("envelope_only", len), &bytes, |b, data| {
            b.iter(|| Envelope::from_bytes(black_box(data)));
        });
        group.bench_with_input(BenchmarkId::new("with_payload", len), &bytes, |b, data| {
            b.iter(|| {
                Envelope::from_bytes(black_box(data))
                    .ok()
                    .map(|envelope| envelope.decoder().decode::<TestRpcRequest>())
            });
        });
    }

    group.finish();
}

fn bench_reject_malformed(c: &mut Criterion) {
    let garbage = vec![0xffu8; 64];
    c.bench_function("envelope_reject_malformed", |b| {
        b.iter(|| Envelope::from_bytes(black_box(&garbage)).is_err());
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_reject_malformed);
criterion_main!(benches);
