//! Dispatch events and the sinks that observe them.
//!
//! Every outcome the registry and the consume loop produce, including dropped
//! messages, is reported as a [`DispatchEvent`] to an injected [`EventSink`].
//! What happens to dropped traffic beyond that is the sink's decision.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize, Serializer};
use tonic::Code;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::consumer::ConsumeStats;

/// Something the dispatcher did or refused to do.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    /// A service was added to the registry.
    Registered {
        /// Service name.
        service: String,
        /// Bound method names.
        methods: Vec<String>,
    },
    /// A handler completed successfully.
    Dispatched {
        /// Service name.
        service: String,
        /// Method name.
        method: String,
        /// Id of the per-call context.
        call_id: Uuid,
    },
    /// Raw bytes could not be decoded as an envelope.
    Malformed {
        /// Decoder error message.
        reason: String,
    },
    /// The envelope named a service that is not registered.
    UnknownService {
        /// Service name.
        service: String,
        /// Method name.
        method: String,
    },
    /// The service exists but has no such method.
    UnknownMethod {
        /// Service name.
        service: String,
        /// Method name.
        method: String,
    },
    /// The handler or the payload decode returned a failure status.
    HandlerFailed {
        /// Service name.
        service: String,
        /// Method name.
        method: String,
        /// Id of the per-call context.
        call_id: Uuid,
        /// Status classification.
        #[serde(serialize_with = "serialize_code")]
        code: Code,
        /// Status message.
        message: String,
    },
    /// The transport closed and the loop finished.
    Closed {
        /// Totals for the finished loop.
        stats: ConsumeStats,
    },
}

impl DispatchEvent {
    /// Short outcome label for per-message events; `None` for lifecycle
    /// events.
    #[must_use]
    pub fn outcome(&self) -> Option<&'static str> {
        match self {
            Self::Dispatched { .. } => Some("dispatched"),
            Self::Malformed { .. } => Some("malformed"),
            Self::UnknownService { .. } => Some("unknown_service"),
            Self::UnknownMethod { .. } => Some("unknown_method"),
            Self::HandlerFailed { .. } => Some("handler_failed"),
            Self::Registered { .. } | Self::Closed { .. } => None,
        }
    }

    /// Returns `true` if the message was discarded without reaching a handler.
    #[must_use]
    pub fn is_dropped(&self) -> bool {
        matches!(
            self,
            Self::Malformed { .. } | Self::UnknownService { .. } | Self::UnknownMethod { .. }
        )
    }
}

fn serialize_code<S: Serializer>(code: &Code, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{code:?}"))
}

/// Receives dispatch events. Called inline on the dispatching task, so
/// implementations must not block.
///
/// The consume loop catches a panic raised here and drops that event. A panic
/// while recording `Registered` propagates out of registration.
pub trait EventSink: Send + Sync {
    /// Records one event.
    fn record(&self, event: &DispatchEvent);
}

/// How loudly [`TracingSink`] reports messages addressed to unknown targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnroutableLog {
    /// Log at `WARN`.
    #[default]
    Warn,
    /// Log at `DEBUG`.
    Debug,
    /// Count only.
    Off,
}

/// Default sink: structured `tracing` output plus `metrics` counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink {
    unroutable: UnroutableLog,
}

impl TracingSink {
    /// Creates a sink that warns on unroutable messages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log level for unknown service/method events.
    #[must_use]
    pub fn with_unroutable(mut self, unroutable: UnroutableLog) -> Self {
        self.unroutable = unroutable;
        self
    }

    fn unroutable(&self, kind: &str, service: &str, method: &str) {
        match self.unroutable {
            UnroutableLog::Warn => {
                warn!(target: "rpcqueue::dispatch", %service, %method, "{kind}; message dropped");
            }
            UnroutableLog::Debug => {
                debug!(target: "rpcqueue::dispatch", %service, %method, "{kind}; message dropped");
            }
            UnroutableLog::Off => {}
        }
    }
}

impl EventSink for TracingSink {
    fn record(&self, event: &DispatchEvent) {
        if let Some(outcome) = event.outcome() {
            metrics::counter!("rpcqueue_messages_total", "outcome" => outcome).increment(1);
        }

        match event {
            DispatchEvent::Registered { service, methods } => {
                info!(target: "rpcqueue::registry", %service, methods = ?methods, "Service registered");
            }
            DispatchEvent::Dispatched {
                service,
                method,
                call_id,
            } => {
                debug!(target: "rpcqueue::dispatch", %service, %method, %call_id, "Call dispatched");
            }
            DispatchEvent::Malformed { reason } => {
                warn!(target: "rpcqueue::dispatch", %reason, "Failed to decode envelope; message dropped");
            }
            DispatchEvent::UnknownService { service, method } => {
                self.unroutable("Unknown service", service, method);
            }
            DispatchEvent::UnknownMethod { service, method } => {
                self.unroutable("Unknown method", service, method);
            }
            DispatchEvent::HandlerFailed {
                service,
                method,
                call_id,
                code,
                message,
            } => {
                warn!(
                    target: "rpcqueue::dispatch",
                    %service,
                    %method,
                    %call_id,
                    code = ?code,
                    %message,
                    "Handler failed"
                );
            }
            DispatchEvent::Closed { stats } => {
                info!(
                    target: "rpcqueue::dispatch",
                    received = stats.received,
                    dispatched = stats.dispatched,
                    failed = stats.failed,
                    dropped = stats.dropped(),
                    "Queue closed; consume loop finished"
                );
            }
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<DispatchEvent>>,
}

impl MemorySink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all recorded events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events.lock().clone()
    }

    /// Counts recorded events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&DispatchEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }

    /// Discards all recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: &DispatchEvent) {
        self.events.lock().push(event.clone());
    }
}
