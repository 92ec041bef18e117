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

//! Server reflection: asking a server which services it serves.
//!
//! A [`Server`](crate::server::Server) with reflection enabled (the default,
//! see [`ServerConfig::reflection`](crate::config::ServerConfig::reflection))
//! answers `ListServices` with every registered service, itself included,
//! in registration order.
//!
//! ```rust,no_run
//! use streamrpc::client::{CallOptions, Client};
//! use streamrpc::config::ClientConfig;
//! use streamrpc::server::reflection::ReflectionClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ReflectionClient::new(Client::connect(&ClientConfig::new()).await?);
//! for service in client.list_services(CallOptions::new()).await? {
//!     println!("{}", service.name);
//!     for method in &service.methods {
//!         println!("  {} ({})", method.path, method.shape);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::call::{CallContext, MethodDescriptor, MethodShape, ServiceDescriptor, Status};
use crate::client::{CallOptions, Client};
use crate::server::handler::{self, ErasedHandler};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// `ListServices`: one request, one response with the full catalog.
pub const LIST_SERVICES: MethodDescriptor = MethodDescriptor::new(
    "/streamrpc.reflection.ServerReflection/ListServices",
    MethodShape::Unary,
    "ListServicesRequest",
    "ListServicesResponse",
);

/// `streamrpc.reflection.ServerReflection`.
pub const REFLECTION_SERVICE: ServiceDescriptor =
    ServiceDescriptor::new("streamrpc.reflection.ServerReflection", &[LIST_SERVICES]);

/// Request for [`LIST_SERVICES`]. Carries nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListServicesRequest {}

/// Every service the server serves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListServicesResponse {
    /// Services in registration order.
    pub services: Vec<ServiceInfo>,
}

/// One served service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Fully qualified service name.
    pub name: String,
    /// Methods in declaration order.
    pub methods: Vec<MethodInfo>,
}

/// One method of a served service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodInfo {
    /// Full method path.
    pub path: String,
    /// Call shape.
    pub shape: MethodShape,
    /// Name of the request message type.
    pub request_type: String,
    /// Name of the response message type.
    pub response_type: String,
}

impl From<&MethodDescriptor> for MethodInfo {
    fn from(method: &MethodDescriptor) -> Self {
        Self {
            path: method.path.to_string(),
            shape: method.shape,
            request_type: method.request_type.to_string(),
            response_type: method.response_type.to_string(),
        }
    }
}

impl From<&ServiceDescriptor> for ServiceInfo {
    fn from(service: &ServiceDescriptor) -> Self {
        Self {
            name: service.name.to_string(),
            methods: service.methods.iter().map(MethodInfo::from).collect(),
        }
    }
}

impl ServiceInfo {
    /// Looks up a method by its last path segment, e.g. `Greet`.
    pub fn method(&self, name: &str) -> Option<&MethodInfo> {
        self.methods
            .iter()
            .find(|method| method.path.rsplit('/').next() == Some(name))
    }
}

/// Handler answering [`LIST_SERVICES`] from a fixed snapshot.
pub(crate) fn list_services_handler(services: &[ServiceDescriptor]) -> Arc<dyn ErasedHandler> {
    let catalog = Arc::new(ListServicesResponse {
        services: services.iter().map(ServiceInfo::from).collect(),
    });
    handler::unary(move |_ctx: CallContext, _request: ListServicesRequest| {
        let catalog = Arc::clone(&catalog);
        async move { Ok::<_, Status>((*catalog).clone()) }
    })
}

/// Typed client for `streamrpc.reflection.ServerReflection`.
#[derive(Debug, Clone)]
pub struct ReflectionClient {
    client: Client,
}

impl ReflectionClient {
    /// Wraps a connected [`Client`].
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Lists the services the server serves.
    ///
    /// # Errors
    ///
    /// Fails with `INTERNAL` if the server has reflection turned off, since
    /// the method is then unknown to it.
    pub async fn list_services(&self, options: CallOptions) -> Result<Vec<ServiceInfo>, Status> {
        let response: ListServicesResponse = self
            .client
            .unary(&LIST_SERVICES, &ListServicesRequest::default(), options)
            .await?;
        Ok(response.services)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_info_from_descriptor() {
        let info = ServiceInfo::from(&REFLECTION_SERVICE);
        assert_eq!(info.name, "streamrpc.reflection.ServerReflection");
        assert_eq!(info.methods.len(), 1);

        let method = info.method("ListServices").unwrap();
        assert_eq!(method.shape, MethodShape::Unary);
        assert_eq!(method.response_type, "ListServicesResponse");
        assert!(info.method("listservices").is_none());
    }

    #[test]
    fn test_handler_is_unary() {
        let handler = list_services_handler(&[REFLECTION_SERVICE]);
        assert_eq!(handler.shape(), MethodShape::Unary);
    }
}
