//! Registry core implementation.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::error::{LookupError, RegistrationError};
use super::service::{MethodHandler, ServiceDesc};
use crate::events::{DispatchEvent, EventSink, TracingSink};

/// Registered methods of one service, bound to its implementation.
struct ServiceEntry {
    methods: HashMap<String, MethodHandler>,
}

/// Table of registered services.
///
/// Registration takes the write lock, so concurrent registrations cannot
/// race; lookups share the read lock and always see a complete service.
pub struct ServiceRegistry {
    services: RwLock<HashMap<String, Arc<ServiceEntry>>>,
    events: Arc<dyn EventSink>,
}

impl ServiceRegistry {
    /// Creates an empty registry reporting to a [`TracingSink`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_events(Arc::new(TracingSink::new()))
    }

    /// Creates an empty registry reporting to `events`.
    #[must_use]
    pub fn with_events(events: Arc<dyn EventSink>) -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Registers `implementation` under the descriptor's service name, binding
    /// one handler per method table entry.
    ///
    /// # Errors
    ///
    /// Returns a [`RegistrationError`] if the descriptor is malformed, does
    /// not bind every declared interface method, or names a service that is
    /// already registered. A failed registration leaves the registry as it
    /// was.
    pub fn register<S>(
        &self,
        desc: &ServiceDesc<S>,
        implementation: Arc<S>,
    ) -> Result<(), RegistrationError>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let service = desc.name();
        if service.is_empty() {
            return Err(RegistrationError::EmptyServiceName);
        }

        let mut methods = HashMap::with_capacity(desc.methods().len());
        for method in desc.methods() {
            if method.name().is_empty() {
                return Err(RegistrationError::EmptyMethodName {
                    service: service.to_string(),
                });
            }
            if methods
                .insert(method.name().to_string(), method.bind(&implementation))
                .is_some()
            {
                return Err(RegistrationError::DuplicateMethod {
                    service: service.to_string(),
                    method: method.name().to_string(),
                });
            }
        }

        if let Some(missing) = desc
            .interface()
            .iter()
            .find(|name| !methods.contains_key(name.as_str()))
        {
            return Err(RegistrationError::MissingMethod {
                service: service.to_string(),
                method: missing.clone(),
            });
        }

        let mut method_names: Vec<String> = methods.keys().cloned().collect();
        method_names.sort();

        {
            let mut services = self.services.write();
            if services.contains_key(service) {
                return Err(RegistrationError::DuplicateService(service.to_string()));
            }
            services.insert(service.to_string(), Arc::new(ServiceEntry { methods }));
        }

        debug!(service_name = %service, "Registered queue service");
        self.events.record(&DispatchEvent::Registered {
            service: service.to_string(),
            methods: method_names,
        });
        Ok(())
    }

    /// Resolves the handler for `service`/`method`.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] if either name is not registered.
    pub fn lookup(&self, service: &str, method: &str) -> Result<MethodHandler, LookupError> {
        let services = self.services.read();
        let entry = services
            .get(service)
            .ok_or_else(|| LookupError::UnknownService(service.to_string()))?;
        entry
            .methods
            .get(method)
            .cloned()
            .ok_or_else(|| LookupError::UnknownMethod {
                service: service.to_string(),
                method: method.to_string(),
            })
    }

    /// Returns `true` if `service` is registered.
    #[must_use]
    pub fn contains(&self, service: &str) -> bool {
        self.services.read().contains_key(service)
    }

    /// Lists registered service names, sorted.
    #[must_use]
    pub fn services(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Lists the bound method names of `service`, sorted.
    #[must_use]
    pub fn methods(&self, service: &str) -> Option<Vec<String>> {
        let services = self.services.read();
        services.get(service).map(|entry| {
            let mut names: Vec<String> = entry.methods.keys().cloned().collect();
            names.sort();
            names
        })
    }

    /// Returns the number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.services.read().len()
    }

    /// Returns true if no services are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
