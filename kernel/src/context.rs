//! Per-call context.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identity of a single queued call.
///
/// Producers create one per enqueue; the consumer builds a fresh one for every
/// dispatched message, carrying the resolved service and method.
#[derive(Debug, Clone)]
pub struct CallContext {
    call_id: Uuid,
    created_at: DateTime<Utc>,
    target: Option<Arc<Target>>,
}

#[derive(Debug)]
struct Target {
    service: String,
    method: String,
}

impl CallContext {
    /// Creates a context with no resolved target.
    #[must_use]
    pub fn new() -> Self {
        Self {
            call_id: Uuid::new_v4(),
            created_at: Utc::now(),
            target: None,
        }
    }

    /// Creates a context for a call resolved to `service`/`method`.
    #[must_use]
    pub fn for_call(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            target: Some(Arc::new(Target {
                service: service.into(),
                method: method.into(),
            })),
            ..Self::new()
        }
    }

    /// Unique id of this call.
    #[must_use]
    pub fn call_id(&self) -> Uuid {
        self.call_id
    }

    /// When the context was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Resolved service name, if any.
    #[must_use]
    pub fn service(&self) -> Option<&str> {
        self.target.as_deref().map(|t| t.service.as_str())
    }

    /// Resolved method name, if any.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        self.target.as_deref().map(|t| t.method.as_str())
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target.as_deref() {
            Some(t) => write!(f, "{}/{}#{}", t.service, t.method, self.call_id),
            None => write!(f, "#{}", self.call_id),
        }
    }
}
