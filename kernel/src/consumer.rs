//! Consume loop.
//!
//! Pulls raw messages off a transport queue, decodes the envelope, resolves
//! the target through the registry and invokes the bound handler. A message
//! that cannot be decoded, routed or handled is reported and skipped; only the
//! queue closing ends the loop.

use futures_util::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{AcquireError, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tonic::Status;
use tracing::{error, info_span, Instrument};

use crate::context::CallContext;
use crate::envelope::{Decoder, Envelope};
use crate::events::{DispatchEvent, EventSink, TracingSink};
use crate::queue::QueueSource;
use crate::registry::{
    LookupError, MethodHandler, RegistrationError, ServiceDesc, ServiceRegistry,
};

/// Totals for one run of the consume loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsumeStats {
    /// Raw messages taken off the queue.
    pub received: u64,
    /// Handlers that completed successfully.
    pub dispatched: u64,
    /// Handlers that returned (or panicked into) a failure status.
    pub failed: u64,
    /// Messages that were not well-formed envelopes.
    pub malformed: u64,
    /// Messages addressed to an unknown service or method.
    pub unroutable: u64,
}

impl ConsumeStats {
    /// Messages discarded before reaching a handler.
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.malformed + self.unroutable
    }

    fn tally(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Dispatched => self.dispatched += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Malformed => self.malformed += 1,
            Outcome::Unroutable => self.unroutable += 1,
        }
    }
}

/// The consume loop stopped for a reason other than the queue closing.
#[derive(Debug, thiserror::Error)]
pub enum ConsumeError {
    /// A dispatch task was cancelled before it finished.
    #[error("dispatch task did not complete: {0}")]
    Task(#[from] JoinError),
    /// The in-flight limiter was closed.
    #[error("dispatch limiter closed: {0}")]
    Limiter(#[from] AcquireError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Dispatched,
    Failed,
    Malformed,
    Unroutable,
}

/// A message resolved to its handler, ready to run.
struct Call {
    ctx: CallContext,
    handler: MethodHandler,
    decoder: Decoder,
}

/// Dispatches queued calls to registered service implementations.
pub struct Consumer {
    registry: Arc<ServiceRegistry>,
    events: Arc<dyn EventSink>,
}

impl Consumer {
    /// Creates a consumer with no services, reporting to a [`TracingSink`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_events(Arc::new(TracingSink::new()))
    }

    /// Creates a consumer with no services whose registry and loop both report
    /// to `events`.
    #[must_use]
    pub fn with_events(events: Arc<dyn EventSink>) -> Self {
        Self {
            registry: Arc::new(ServiceRegistry::with_events(Arc::clone(&events))),
            events,
        }
    }

    /// Registers a service implementation. Must happen before consuming.
    ///
    /// # Errors
    ///
    /// See [`ServiceRegistry::register`].
    pub fn register<S>(
        &self,
        desc: &ServiceDesc<S>,
        implementation: Arc<S>,
    ) -> Result<(), RegistrationError>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.registry.register(desc, implementation)
    }

    /// The registry this consumer dispatches through.
    #[must_use]
    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    /// Processes messages one at a time, in queue order, until the queue is
    /// closed and drained.
    ///
    /// Each handler finishes before the next message is received, so a slow
    /// handler holds up the whole queue.
    ///
    /// # Errors
    ///
    /// Per-message failures never surface here; they are reported to the
    /// event sink. The sequential loop currently always returns `Ok`.
    pub async fn consume<Q: QueueSource>(&self, mut queue: Q) -> Result<ConsumeStats, ConsumeError> {
        let mut stats = ConsumeStats::default();

        while let Some(data) = queue.recv().await {
            stats.received += 1;
            let outcome = match self.resolve(&data) {
                Ok(call) => invoke(call, self.events.as_ref()).await,
                Err(outcome) => outcome,
            };
            stats.tally(outcome);
        }

        emit(self.events.as_ref(), &DispatchEvent::Closed { stats });
        Ok(stats)
    }

    /// Processes messages with up to `max_in_flight` handlers running at once.
    ///
    /// Messages are still received and resolved in queue order, but handlers
    /// run on separate tasks and may complete in any order. With
    /// `max_in_flight <= 1` this is [`Consumer::consume`].
    ///
    /// # Errors
    ///
    /// Returns [`ConsumeError`] if a dispatch task is cancelled by the runtime.
    pub async fn consume_concurrent<Q: QueueSource>(
        &self,
        mut queue: Q,
        max_in_flight: usize,
    ) -> Result<ConsumeStats, ConsumeError> {
        if max_in_flight <= 1 {
            return self.consume(queue).await;
        }

        let limiter = Arc::new(Semaphore::new(max_in_flight));
        let mut tasks = JoinSet::new();
        let mut stats = ConsumeStats::default();

        loop {
            let permit = Arc::clone(&limiter).acquire_owned().await?;
            while let Some(finished) = tasks.try_join_next() {
                stats.tally(finished?);
            }

            let Some(data) = queue.recv().await else {
                break;
            };
            stats.received += 1;

            match self.resolve(&data) {
                Ok(call) => {
                    let events = Arc::clone(&self.events);
                    tasks.spawn(async move {
                        let outcome = invoke(call, events.as_ref()).await;
                        drop(permit);
                        outcome
                    });
                }
                Err(outcome) => stats.tally(outcome),
            }
        }

        while let Some(finished) = tasks.join_next().await {
            stats.tally(finished?);
        }

        emit(self.events.as_ref(), &DispatchEvent::Closed { stats });
        Ok(stats)
    }

    /// Decodes the envelope shell and looks up its handler.
    fn resolve(&self, data: &[u8]) -> Result<Call, Outcome> {
        let envelope = match Envelope::from_bytes(data) {
            Ok(envelope) => envelope,
            Err(err) => {
                emit(self.events.as_ref(), &DispatchEvent::Malformed {
                    reason: err.to_string(),
                });
                return Err(Outcome::Malformed);
            }
        };

        match self.registry.lookup(&envelope.service, &envelope.method) {
            Ok(handler) => Ok(Call {
                decoder: envelope.decoder(),
                ctx: CallContext::for_call(envelope.service, envelope.method),
                handler,
            }),
            Err(LookupError::UnknownService(_)) => {
                emit(self.events.as_ref(), &DispatchEvent::UnknownService {
                    service: envelope.service,
                    method: envelope.method,
                });
                Err(Outcome::Unroutable)
            }
            Err(LookupError::UnknownMethod { .. }) => {
                emit(self.events.as_ref(), &DispatchEvent::UnknownMethod {
                    service: envelope.service,
                    method: envelope.method,
                });
                Err(Outcome::Unroutable)
            }
        }
    }
}

impl Default for Consumer {
    fn default() -> Self {
        Self::new()
    }
}

/// Hands `event` to the sink. A panicking sink loses the event but not the
/// loop.
fn emit(events: &dyn EventSink, event: &DispatchEvent) {
    if std::panic::catch_unwind(AssertUnwindSafe(|| events.record(event))).is_err() {
        error!(target: "rpcqueue::dispatch", outcome = ?event.outcome(), "Event sink panicked; event lost");
    }
}

/// Runs one resolved call and reports how it ended. A panicking handler is
/// reported as an `Internal` failure.
async fn invoke(call: Call, events: &dyn EventSink) -> Outcome {
    let Call {
        ctx,
        handler,
        decoder,
    } = call;
    let service = ctx.service().unwrap_or_default().to_string();
    let method = ctx.method().unwrap_or_default().to_string();
    let call_id = ctx.call_id();

    let span = info_span!(
        "dispatch",
        %service,
        %method,
        %call_id,
        created_at = %ctx.created_at()
    );
    let result = AssertUnwindSafe(async move { handler(ctx, decoder).await })
        .catch_unwind()
        .instrument(span)
        .await
        .unwrap_or_else(|_| Err(Status::internal("handler panicked")));

    match result {
        Ok(()) => {
            emit(events, &DispatchEvent::Dispatched {
                service,
                method,
                call_id,
            });
            Outcome::Dispatched
        }
        Err(status) => {
            emit(events, &DispatchEvent::HandlerFailed {
                service,
                method,
                call_id,
                code: status.code(),
                message: status.message().to_string(),
            });
            Outcome::Failed
        }
    }
}
