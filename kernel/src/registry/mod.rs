//! Service registry.
//!
//! Maps service names to method tables. Each table entry is a handler bound to
//! one implementation instance at registration time, so dispatch only needs a
//! name lookup. Misconfiguration is rejected here, before any message flows;
//! unknown names at dispatch time are a recoverable [`LookupError`].

mod core;
mod error;
mod service;

pub use self::core::ServiceRegistry;
pub use error::{LookupError, RegistrationError};
pub use service::{HandlerFuture, MethodDesc, MethodHandler, ServiceDesc};
