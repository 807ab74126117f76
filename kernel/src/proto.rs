//! Queue glue for the `proto.Test` service.
//!
//! This is the shape an IDL generator emits for each service: the message
//! types, a server trait, a descriptor that binds the trait's methods, a
//! registration helper for consumers and a typed producer.

use async_trait::async_trait;
use std::sync::Arc;
use tonic::Status;

use crate::consumer::Consumer;
use crate::context::CallContext;
use crate::producer::{EnqueueError, Producer};
use crate::queue::QueueSink;
use crate::registry::{MethodDesc, RegistrationError, ServiceDesc};

/// Fully qualified service name.
pub const TEST_SERVICE: &str = "proto.Test";
/// Method name of [`TestServer::test_rpc`].
pub const TEST_RPC: &str = "TestRPC";

/// Request of `proto.Test/TestRPC`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TestRpcRequest {
    /// Free-form message.
    #[prost(string, tag = "1")]
    pub message: String,
}

/// Response of `proto.Test/TestRPC`. Discarded by the consumer.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TestRpcResponse {}

/// Server side of `proto.Test`.
#[async_trait]
pub trait TestServer: Send + Sync {
    /// Handles one `TestRPC` call.
    async fn test_rpc(
        &self,
        ctx: CallContext,
        request: TestRpcRequest,
    ) -> Result<TestRpcResponse, Status>;
}

/// Descriptor binding every `TestServer` method.
#[must_use]
pub fn test_service_desc() -> ServiceDesc<dyn TestServer> {
    ServiceDesc::new(TEST_SERVICE)
        .with_interface([TEST_RPC])
        .method(MethodDesc::unary(
            TEST_RPC,
            |server: Arc<dyn TestServer>, ctx, request: TestRpcRequest| async move {
                server.test_rpc(ctx, request).await
            },
        ))
}

/// Registers `server` as the `proto.Test` implementation of `consumer`.
///
/// # Errors
///
/// Returns an error if `proto.Test` is already registered.
pub fn register_test_queue_consumer(
    consumer: &Consumer,
    server: Arc<dyn TestServer>,
) -> Result<(), RegistrationError> {
    consumer.register(&test_service_desc(), server)
}

/// Typed producer for `proto.Test`.
#[derive(Debug, Clone)]
pub struct TestQueueProducer<Q> {
    inner: Producer<Q>,
}

impl<Q: QueueSink> TestQueueProducer<Q> {
    /// Creates a producer writing to `queue`.
    pub fn new(queue: Q) -> Self {
        Self {
            inner: Producer::new(queue),
        }
    }

    /// Enqueues a `TestRPC` call.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be encoded or the queue is
    /// closed.
    pub async fn enqueue_test_rpc(
        &self,
        ctx: &CallContext,
        request: &TestRpcRequest,
    ) -> Result<(), EnqueueError> {
        self.inner.enqueue(ctx, TEST_SERVICE, TEST_RPC, request).await
    }
}
