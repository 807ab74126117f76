//! Service and method descriptors.

use futures_util::future::{self, BoxFuture};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tonic::Status;

use crate::context::CallContext;
use crate::envelope::{Decoder, WireMessage};

/// Future returned by a method handler. The response value is not delivered
/// anywhere, only success or the failure status.
pub type HandlerFuture = BoxFuture<'static, Result<(), Status>>;

/// A method bound to its implementation instance, as stored in the registry.
pub type MethodHandler = Arc<dyn Fn(CallContext, Decoder) -> HandlerFuture + Send + Sync>;

type UnboundHandler<S> = Arc<dyn Fn(Arc<S>, CallContext, Decoder) -> HandlerFuture + Send + Sync>;

/// One entry of a method table: a name and a handler over implementations of
/// `S`.
pub struct MethodDesc<S: ?Sized> {
    name: String,
    handler: UnboundHandler<S>,
}

impl<S: ?Sized + Send + Sync + 'static> MethodDesc<S> {
    /// Describes a unary method whose request type is `Req`.
    ///
    /// The payload is decoded as `Req` before `call` runs; a payload that is
    /// not a valid `Req` fails the call with `InvalidArgument`.
    pub fn unary<Req, Resp, F, Fut>(name: impl Into<String>, call: F) -> Self
    where
        Req: WireMessage,
        F: Fn(Arc<S>, CallContext, Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp, Status>> + Send + 'static,
    {
        let handler = move |service: Arc<S>, ctx: CallContext, decoder: Decoder| -> HandlerFuture {
            match decoder.decode::<Req>() {
                Ok(request) => {
                    let response = call(service, ctx, request);
                    Box::pin(async move { response.await.map(|_| ()) })
                }
                Err(status) => Box::pin(future::ready(Err(status))),
            }
        };
        Self {
            name: name.into(),
            handler: Arc::new(handler),
        }
    }

    /// Describes a method that decodes its own payload.
    pub fn raw<F, Fut>(name: impl Into<String>, call: F) -> Self
    where
        F: Fn(Arc<S>, CallContext, Decoder) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Status>> + Send + 'static,
    {
        let handler = move |service: Arc<S>, ctx: CallContext, decoder: Decoder| -> HandlerFuture {
            Box::pin(call(service, ctx, decoder))
        };
        Self {
            name: name.into(),
            handler: Arc::new(handler),
        }
    }
}

impl<S: ?Sized> MethodDesc<S> {
    /// Method name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(super) fn bind(&self, implementation: &Arc<S>) -> MethodHandler
    where
        S: Send + Sync + 'static,
    {
        let handler = Arc::clone(&self.handler);
        let implementation = Arc::clone(implementation);
        Arc::new(move |ctx: CallContext, decoder: Decoder| -> HandlerFuture {
            handler(Arc::clone(&implementation), ctx, decoder)
        })
    }
}

impl<S: ?Sized> Clone for MethodDesc<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<S: ?Sized> fmt::Debug for MethodDesc<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDesc")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Describes a service: its name, the methods its interface declares, and the
/// method table that binds them.
///
/// The implementation type `S` is usually a trait object such as
/// `dyn TestServer`, so any implementation of the trait can be registered and
/// a non-conforming one is a compile error. When an interface is declared with
/// [`ServiceDesc::with_interface`], registration also checks that every
/// declared method is bound.
pub struct ServiceDesc<S: ?Sized> {
    name: String,
    interface: Vec<String>,
    methods: Vec<MethodDesc<S>>,
}

impl<S: ?Sized> ServiceDesc<S> {
    /// Starts a descriptor for `name` with an empty method table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            interface: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Declares the methods the service interface requires.
    #[must_use]
    pub fn with_interface<I, N>(mut self, methods: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<String>,
    {
        self.interface = methods.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a method table entry.
    #[must_use]
    pub fn method(mut self, method: MethodDesc<S>) -> Self {
        self.methods.push(method);
        self
    }

    /// Service name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Methods the interface declares.
    #[must_use]
    pub fn interface(&self) -> &[String] {
        &self.interface
    }

    /// Method table entries.
    #[must_use]
    pub fn methods(&self) -> &[MethodDesc<S>] {
        &self.methods
    }
}

impl<S: ?Sized> Clone for ServiceDesc<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            interface: self.interface.clone(),
            methods: self.methods.clone(),
        }
    }
}

impl<S: ?Sized> fmt::Debug for ServiceDesc<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDesc")
            .field("name", &self.name)
            .field("interface", &self.interface)
            .field("methods", &self.methods)
            .finish()
    }
}
