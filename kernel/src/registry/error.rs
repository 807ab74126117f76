//! Registration and lookup errors.

/// A service could not be registered. Always a configuration mistake.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// The descriptor has no service name.
    #[error("service name must not be empty")]
    EmptyServiceName,
    /// A method table entry has no name.
    #[error("service {service} binds a method with an empty name")]
    EmptyMethodName {
        /// Service being registered.
        service: String,
    },
    /// The service name is already taken.
    #[error("duplicate service registration for {0:?}")]
    DuplicateService(String),
    /// The method table binds the same method twice.
    #[error("service {service} binds method {method} more than once")]
    DuplicateMethod {
        /// Service being registered.
        service: String,
        /// Repeated method name.
        method: String,
    },
    /// The interface declares a method the table does not bind.
    #[error("implementation of {service} does not provide method {method}")]
    MissingMethod {
        /// Service being registered.
        service: String,
        /// Declared but unbound method.
        method: String,
    },
}

/// A dispatch target could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    /// No service with this name is registered.
    #[error("unknown service {0}")]
    UnknownService(String),
    /// The service is registered but has no such method.
    #[error("unknown method {method} on service {service}")]
    UnknownMethod {
        /// Resolved service name.
        service: String,
        /// Missing method name.
        method: String,
    },
}
