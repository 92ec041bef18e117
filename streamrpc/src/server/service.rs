//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use crate::call::{CallContext, MethodDescriptor, MethodShape, ServiceDescriptor, Status};
use crate::server::handler::{
    self, BidiStreamingHandler, ClientStreamingHandler, ErasedHandler, ServerStreamingHandler,
};
use crate::server::reflection::{self, LIST_SERVICES, REFLECTION_SERVICE};
use crate::session::{MessageSink, MessageStream};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Errors found while assembling services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    /// A handler was registered with a shape other than its descriptor's.
    #[error("method {path} is declared {declared} but was registered as {registered}")]
    ShapeMismatch {
        /// Method path
        path: &'static str,
        /// Shape in the descriptor
        declared: MethodShape,
        /// Shape of the handler
        registered: MethodShape,
    },

    /// A handler was registered for a method the service does not declare.
    #[error("method {path} is not declared by service {service}")]
    UnknownMethod {
        /// Service name
        service: &'static str,
        /// Method path
        path: &'static str,
    },

    /// A declared method has no handler.
    #[error("method {path} has no handler")]
    MissingHandler {
        /// Method path
        path: &'static str,
    },

    /// Two handlers claim the same method path.
    #[error("method {path} is registered more than once")]
    DuplicateMethod {
        /// Method path
        path: &'static str,
    },
}

/// A service descriptor paired with a handler for each of its methods.
pub struct Service {
    descriptor: ServiceDescriptor,
    handlers: Vec<(&'static str, Arc<dyn ErasedHandler>)>,
}

impl Service {
    /// Starts registering handlers for `descriptor`.
    pub fn builder(descriptor: ServiceDescriptor) -> ServiceBuilder {
        ServiceBuilder::new(descriptor)
    }

    /// The service's descriptor.
    pub fn descriptor(&self) -> &ServiceDescriptor {
        &self.descriptor
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("name", &self.descriptor.name)
            .field(
                "methods",
                &self.handlers.iter().map(|(path, _)| *path).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Builds a [`Service`], checking each handler against the descriptor.
///
/// Registration errors are held until [`build`](Self::build) so the builder
/// can be chained:
///
/// ```rust
/// use streamrpc::call::{MethodDescriptor, MethodShape, ServiceDescriptor, Status};
/// use streamrpc::server::Service;
///
/// const ECHO: MethodDescriptor =
///     MethodDescriptor::new("/demo.Echo/Echo", MethodShape::Unary, "String", "String");
/// const SERVICE: ServiceDescriptor = ServiceDescriptor::new("demo.Echo", &[ECHO]);
///
/// let service = Service::builder(SERVICE)
///     .unary(&ECHO, |_ctx, request: String| async move { Ok::<_, Status>(request) })
///     .build()
///     .unwrap();
/// assert_eq!(service.descriptor().name, "demo.Echo");
/// ```
pub struct ServiceBuilder {
    descriptor: ServiceDescriptor,
    handlers: Vec<(&'static str, Arc<dyn ErasedHandler>)>,
    error: Option<ServiceError>,
}

impl ServiceBuilder {
    /// Creates a builder with no handlers.
    pub fn new(descriptor: ServiceDescriptor) -> Self {
        Self {
            descriptor,
            handlers: Vec::new(),
            error: None,
        }
    }

    /// Registers a unary handler.
    pub fn unary<F, Req, Resp, Fut>(self, method: &'static MethodDescriptor, f: F) -> Self
    where
        F: Fn(CallContext, Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp, Status>> + Send + 'static,
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + Send + Sync + 'static,
    {
        self.register(method, handler::unary(f))
    }

    /// Registers a server-streaming handler.
    pub fn server_streaming<F, Req, Resp, Fut>(
        self,
        method: &'static MethodDescriptor,
        f: F,
    ) -> Self
    where
        F: Fn(CallContext, Req, MessageSink<Resp>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Status>> + Send + 'static,
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + Send + Sync + 'static,
    {
        self.register(method, Arc::new(ServerStreamingHandler::new(f)))
    }

    /// Registers a client-streaming handler.
    pub fn client_streaming<F, Req, Resp, Fut>(
        self,
        method: &'static MethodDescriptor,
        f: F,
    ) -> Self
    where
        F: Fn(CallContext, MessageStream<Req>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp, Status>> + Send + 'static,
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + Send + Sync + 'static,
    {
        self.register(method, Arc::new(ClientStreamingHandler::new(f)))
    }

    /// Registers a bidirectional-streaming handler.
    pub fn bidi_streaming<F, Req, Resp, Fut>(
        self,
        method: &'static MethodDescriptor,
        f: F,
    ) -> Self
    where
        F: Fn(CallContext, MessageStream<Req>, MessageSink<Resp>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), Status>> + Send + 'static,
        Req: DeserializeOwned + Send + 'static,
        Resp: Serialize + Send + Sync + 'static,
    {
        self.register(method, Arc::new(BidiStreamingHandler::new(f)))
    }

    /// Finishes the service.
    ///
    /// # Errors
    ///
    /// Returns the first registration error, or
    /// [`ServiceError::MissingHandler`] if a declared method has no handler.
    pub fn build(self) -> Result<Service, ServiceError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        for method in self.descriptor.methods {
            if !self.handlers.iter().any(|(path, _)| *path == method.path) {
                return Err(ServiceError::MissingHandler { path: method.path });
            }
        }
        Ok(Service {
            descriptor: self.descriptor,
            handlers: self.handlers,
        })
    }

    fn register(
        mut self,
        method: &'static MethodDescriptor,
        handler: Arc<dyn ErasedHandler>,
    ) -> Self {
        if self.error.is_some() {
            return self;
        }
        let error = if self.descriptor.method(method.path).is_none() {
            Some(ServiceError::UnknownMethod {
                service: self.descriptor.name,
                path: method.path,
            })
        } else if method.shape != handler.shape() {
            Some(ServiceError::ShapeMismatch {
                path: method.path,
                declared: method.shape,
                registered: handler.shape(),
            })
        } else if self.handlers.iter().any(|(path, _)| *path == method.path) {
            Some(ServiceError::DuplicateMethod { path: method.path })
        } else {
            None
        };

        match error {
            Some(error) => self.error = Some(error),
            None => self.handlers.push((method.path, handler)),
        }
        self
    }
}

/// Exact-match table from full method path to handler.
#[derive(Default, Clone)]
pub(crate) struct Router {
    routes: HashMap<&'static str, Arc<dyn ErasedHandler>>,
    /// Registered services in registration order.
    services: Vec<ServiceDescriptor>,
}

impl Router {
    pub(crate) fn add(&mut self, service: Service) -> Result<(), ServiceError> {
        if let Some((path, _)) = service
            .handlers
            .iter()
            .find(|(path, _)| self.routes.contains_key(path))
        {
            return Err(ServiceError::DuplicateMethod { path: *path });
        }
        self.services.push(service.descriptor);
        self.routes.extend(service.handlers);
        Ok(())
    }

    /// Serves reflection listing every service registered so far, replacing
    /// any earlier listing. The reflection service always comes last.
    pub(crate) fn refresh_reflection(&mut self) {
        self.services
            .retain(|service| service.name != REFLECTION_SERVICE.name);
        self.services.push(REFLECTION_SERVICE);
        self.routes
            .insert(LIST_SERVICES.path, reflection::list_services_handler(&self.services));
    }

    pub(crate) fn services(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    pub(crate) fn route(&self, path: &str) -> Option<Arc<dyn ErasedHandler>> {
        self.routes.get(path).cloned()
    }

    pub(crate) fn methods(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.routes.keys().copied()
    }
}
