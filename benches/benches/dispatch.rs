//! Benchmarks for the consume loop in kernel/src/consumer.rs
//!
//! Performance-critical paths:
//! - `Consumer::consume`: decode, resolve and invoke per message
//! - `Consumer::consume_concurrent`: the same with handlers on tasks
//! - `ServiceRegistry::lookup`: read-locked handler resolution

#![allow(missing_docs)]

use async_trait::async_trait;
use bytes::Bytes;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rpcqueue_kernel::proto::{
    register_test_queue_consumer, TestRpcRequest, TestRpcResponse, TestServer, TEST_RPC,
    TEST_SERVICE,
};
use rpcqueue_kernel::{queue, CallContext, Consumer, Envelope, MemorySink, Status};
use std::sync::Arc;
use tokio::runtime::Runtime;

struct NoopServer;

#[async_trait]
impl TestServer for NoopServer {
    async fn test_rpc(
        &self,
        _ctx: CallContext,
        request: TestRpcRequest,
    ) -> Result<TestRpcResponse, Status> {
        black_box(request);
        Ok(TestRpcResponse {})
    }
}

fn consumer() -> Consumer {
    let consumer = Consumer::with_events(Arc::new(NullSink));
    if let Err(e) = register_test_queue_consumer(&consumer, Arc::new(NoopServer)) {
        panic!("registration failed: {e}");
    }
    consumer
}

/// Discards every event so the sink is not what gets measured.
struct NullSink;

impl rpcqueue_kernel::EventSink for NullSink {
    fn record(&self, _event: &rpcqueue_kernel::DispatchEvent) {}
}

fn batch(count: usize) -> Vec<Bytes> {
    let request = TestRpcRequest {
        message: "Hello World".to_string(),
    };
    let Ok(bytes) = Envelope::encode_call(TEST_SERVICE, TEST_RPC, &request) else {
        panic!("encode failed");
    };
    vec![bytes; count]
}

fn fill(messages: &[Bytes]) -> tokio::sync::mpsc::UnboundedReceiver<Bytes> {
    let (tx, rx) = queue::unbounded();
    for message in messages {
        let Ok(()) = tx.send(message.clone()) else {
            panic!("queue closed while filling");
        };
    }
    rx
}

fn bench_consume(c: &mut Criterion) {
    let Ok(rt) = Runtime::new() else {
        panic!("runtime");
    };
    let consumer = Arc::new(consumer());
    let mut group = c.benchmark_group("consume");

    for count in [100, 1000] {
        let messages = batch(count);
        group.throughput(Throughput::Elements(count as u64));

        group.bench_with_input(BenchmarkId::new("sequential", count), &messages, |b, msgs| {
            b.to_async(&rt).iter(|| {
                let consumer = Arc::clone(&consumer);
                let rx = fill(msgs);
                async move { consumer.consume(rx).await }
            });
        });

        group.bench_with_input(BenchmarkId::new("concurrent_8", count), &messages, |b, msgs| {
            b.to_async(&rt).iter(|| {
                let consumer = Arc::clone(&consumer);
                let rx = fill(msgs);
                async move { consumer.consume_concurrent(rx, 8).await }
            });
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let consumer = consumer();
    let registry = consumer.registry();

    c.bench_function("registry_lookup_hit", |b| {
        b.iter(|| registry.lookup(black_box(TEST_SERVICE), black_box(TEST_RPC)).is_ok());
    });
    c.bench_function("registry_lookup_miss", |b| {
        b.iter(|| registry.lookup(black_box("foo.Bar"), black_box("Unknown")).is_err());
    });
}

// MemorySink cost, for comparison with the null sink above.
fn bench_memory_sink(c: &mut Criterion) {
    let Ok(rt) = Runtime::new() else {
        panic!("runtime");
    };
    let sink = Arc::new(MemorySink::new());
    let consumer = Arc::new(Consumer::with_events(sink.clone()));
    if let Err(e) = register_test_queue_consumer(&consumer, Arc::new(NoopServer)) {
        panic!("registration failed: {e}");
    }
    let messages = batch(100);

    c.bench_function("consume_memory_sink_100", |b| {
        b.to_async(&rt).iter(|| {
            sink.clear();
            let consumer = Arc::clone(&consumer);
            let rx = fill(&messages);
            async move { consumer.consume(rx).await }
        });
    });
}

criterion_group!(benches, bench_consume, bench_lookup, bench_memory_sink);
criterion_main!(benches);
