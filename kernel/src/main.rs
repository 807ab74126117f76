//! Demo: queue a few `proto.Test` calls, including one to an unregistered
//! service, and let a consumer drain them.

use anyhow::Context;
use async_trait::async_trait;
use rpcqueue_kernel::infrastructure::{config::Settings, telemetry::TelemetryBuilder};
use rpcqueue_kernel::proto::{
    register_test_queue_consumer, TestQueueProducer, TestRpcRequest, TestRpcResponse, TestServer,
};
use rpcqueue_kernel::{enqueue, queue, CallContext, Consumer, Status, TracingSink};
use std::sync::Arc;
use tracing::info;

/// Logs every `TestRPC` message it receives.
struct EchoServer;

#[async_trait]
impl TestServer for EchoServer {
    async fn test_rpc(
        &self,
        ctx: CallContext,
        request: TestRpcRequest,
    ) -> Result<TestRpcResponse, Status> {
        info!(call_id = %ctx.call_id(), message = %request.message, "[testServer]");
        Ok(TestRpcResponse {})
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Settings::new().context("Failed to load configuration")?;

    let metrics = TelemetryBuilder::from_settings(&config.telemetry)
        .with_metrics()
        .init()
        .context("Failed to initialize telemetry")?;

    info!("rpcqueue demo starting...");

    let sink = TracingSink::new().with_unroutable(config.consumer.log_unroutable);
    let consumer = Arc::new(Consumer::with_events(Arc::new(sink)));
    register_test_queue_consumer(&consumer, Arc::new(EchoServer))
        .context("Failed to register proto.Test")?;

    let (tx, rx) = queue::bounded(config.consumer.queue_capacity);
    let max_in_flight = config.consumer.max_in_flight;
    let consuming = {
        let consumer = Arc::clone(&consumer);
        tokio::spawn(async move { consumer.consume_concurrent(rx, max_in_flight).await })
    };

    let producer = TestQueueProducer::new(tx.clone());
    let ctx = CallContext::new();

    for message in ["Hello World", "Where am I?"] {
        info!("Enqueue: {message}");
        producer
            .enqueue_test_rpc(
                &ctx,
                &TestRpcRequest {
                    message: message.to_string(),
                },
            )
            .await?;
    }

    info!("Enqueue: Unknown on foo.Bar");
    enqueue(&ctx, "foo.Bar", "Unknown", &TestRpcRequest::default(), &tx).await?;

    info!("Enqueue: Goodbye!");
    producer
        .enqueue_test_rpc(
            &ctx,
            &TestRpcRequest {
                message: "Goodbye!".to_string(),
            },
        )
        .await?;

    // Dropping the last sender closes the queue.
    drop(producer);
    drop(tx);
    info!("Waiting for the consumer to drain the queue");

    let stats = consuming.await.context("Consumer task failed")??;
    info!(
        received = stats.received,
        dispatched = stats.dispatched,
        dropped = stats.dropped(),
        "rpcqueue demo finished"
    );

    if let Some(handle) = metrics {
        println!("{}", handle.render());
    }
    Ok(())
}
