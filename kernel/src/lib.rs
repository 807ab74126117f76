//! rpcqueue kernel - queue-backed dispatch of RPC-shaped service calls.
//!
//! Producers encode a call (service, method, typed argument) into an
//! [`envelope::Envelope`] and push it onto a transport queue. A
//! [`consumer::Consumer`] holding a registry of service implementations pulls
//! messages off the queue, resolves their target and invokes the bound
//! handler. Callers and implementations never share a connection.
//!
//! Delivery is best-effort and at-most-once: malformed, unroutable and failed
//! messages are reported to an [`events::EventSink`] and skipped.

#![warn(clippy::pedantic)]

/// Per-call context.
pub mod context;
/// Consume loop.
pub mod consumer;
/// Wire envelope and payload codecs.
pub mod envelope;
/// Dispatch events and sinks.
pub mod events;
/// Infrastructure components (config, telemetry).
pub mod infrastructure;
/// Enqueue operation.
pub mod producer;
/// Queue glue for the `proto.Test` example service.
pub mod proto;
/// Transport queue seams.
pub mod queue;
/// Service registry.
pub mod registry;

pub use consumer::{ConsumeError, ConsumeStats, Consumer};
pub use context::CallContext;
pub use envelope::{CodecError, Decoder, Envelope, Json, WireMessage};
pub use events::{DispatchEvent, EventSink, MemorySink, TracingSink};
pub use producer::{enqueue, EnqueueError, Producer};
pub use queue::{QueueClosed, QueueSink, QueueSource};
pub use registry::{LookupError, MethodDesc, RegistrationError, ServiceDesc, ServiceRegistry};
pub use tonic::{Code, Status};
