//! Enqueue operation.
//!
//! Producers turn a call into envelope bytes and push them onto a transport
//! queue. Nothing flows back: a consumer-side failure is never reported to
//! the producer.

use tracing::{debug, instrument};

use crate::context::CallContext;
use crate::envelope::{CodecError, Envelope, WireMessage};
use crate::queue::{QueueClosed, QueueSink};

/// Errors returned to the caller of [`enqueue`].
#[derive(Debug, thiserror::Error)]
pub enum EnqueueError {
    /// The call could not be encoded. Nothing was queued.
    #[error("failed to encode call: {0}")]
    Encode(#[from] CodecError),
    /// The queue no longer accepts messages.
    #[error(transparent)]
    Closed(#[from] QueueClosed),
}

/// Encodes `argument` as a call to `service`/`method` and pushes it onto
/// `queue`, waiting for capacity if the queue is bounded and full.
///
/// # Errors
///
/// Returns [`EnqueueError::Encode`] if the call cannot be encoded, or
/// [`EnqueueError::Closed`] if the queue has been closed.
#[instrument(level = "debug", skip(argument, queue), fields(call_id = %ctx.call_id()))]
pub async fn enqueue<A, Q>(
    ctx: &CallContext,
    service: &str,
    method: &str,
    argument: &A,
    queue: &Q,
) -> Result<(), EnqueueError>
where
    A: WireMessage,
    Q: QueueSink + ?Sized,
{
    let data = Envelope::encode_call(service, method, argument)?;
    let size = data.len();
    queue.send(data).await?;
    debug!(size, "Call enqueued");
    Ok(())
}

/// A cloneable handle that enqueues calls onto one queue.
///
/// Per-service producer glue wraps this and fixes the service and method
/// names.
#[derive(Debug, Clone)]
pub struct Producer<Q> {
    queue: Q,
}

impl<Q: QueueSink> Producer<Q> {
    /// Creates a producer writing to `queue`.
    pub fn new(queue: Q) -> Self {
        Self { queue }
    }

    /// Enqueues a call. See [`enqueue`].
    ///
    /// # Errors
    ///
    /// Returns an [`EnqueueError`] if encoding fails or the queue is closed.
    pub async fn enqueue<A: WireMessage + Sync>(
        &self,
        ctx: &CallContext,
        service: &str,
        method: &str,
        argument: &A,
    ) -> Result<(), EnqueueError> {
        enqueue(ctx, service, method, argument, &self.queue).await
    }

    /// Unwraps the producer, returning the queue. Dropping every sender closes
    /// an in-memory queue.
    pub fn into_inner(self) -> Q {
        self.queue
    }
}
