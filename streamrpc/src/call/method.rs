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

//! Method and service descriptors.
//!
//! Descriptors are the wire contract between client and server. They are
//! plain `const` data so a service can be declared once and shared by both
//! sides:
//!
//! ```rust
//! use streamrpc::call::{MethodDescriptor, MethodShape, ServiceDescriptor};
//!
//! const ECHO: MethodDescriptor =
//!     MethodDescriptor::new("/demo.Echo/Echo", MethodShape::Unary, "EchoRequest", "EchoResponse");
//! const SERVICE: ServiceDescriptor = ServiceDescriptor::new("demo.Echo", &[ECHO]);
//!
//! assert_eq!(SERVICE.method("/demo.Echo/Echo").unwrap().shape, MethodShape::Unary);
//! assert_eq!(ECHO.method_name(), "Echo");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cardinality of requests and responses for a method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MethodShape {
    /// One request, one response.
    Unary,
    /// One request, a stream of responses.
    ServerStream,
    /// A stream of requests, one response.
    ClientStream,
    /// Streams in both directions.
    BidiStream,
}

impl MethodShape {
    /// Maximum number of messages the client may send, if bounded.
    pub const fn client_send_limit(self) -> Option<u64> {
        match self {
            MethodShape::Unary | MethodShape::ServerStream => Some(1),
            MethodShape::ClientStream | MethodShape::BidiStream => None,
        }
    }

    /// Maximum number of messages the server may send, if bounded.
    pub const fn server_send_limit(self) -> Option<u64> {
        match self {
            MethodShape::Unary | MethodShape::ClientStream => Some(1),
            MethodShape::ServerStream | MethodShape::BidiStream => None,
        }
    }

    /// `true` if the client side streams.
    pub const fn is_client_streaming(self) -> bool {
        self.client_send_limit().is_none()
    }

    /// `true` if the server side streams.
    pub const fn is_server_streaming(self) -> bool {
        self.server_send_limit().is_none()
    }

    /// Short lowercase label used in logs and metrics.
    pub const fn as_str(self) -> &'static str {
        match self {
            MethodShape::Unary => "unary",
            MethodShape::ServerStream => "server_stream",
            MethodShape::ClientStream => "client_stream",
            MethodShape::BidiStream => "bidi_stream",
        }
    }
}

impl fmt::Display for MethodShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of one remote method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// Full path, `/<package>.<Service>/<Method>`. Routing matches it exactly.
    pub path: &'static str,
    /// Call shape.
    pub shape: MethodShape,
    /// Name of the request message type.
    pub request_type: &'static str,
    /// Name of the response message type.
    pub response_type: &'static str,
}

impl MethodDescriptor {
    /// Creates a descriptor.
    pub const fn new(
        path: &'static str,
        shape: MethodShape,
        request_type: &'static str,
        response_type: &'static str,
    ) -> Self {
        Self {
            path,
            shape,
            request_type,
            response_type,
        }
    }

    /// The last path segment.
    pub fn method_name(&self) -> &'static str {
        self.path.rsplit('/').next().unwrap_or(self.path)
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path, self.shape)
    }
}

/// An ordered list of methods exposed under one service name.
#[derive(Debug, Clone, Copy)]
pub struct ServiceDescriptor {
    /// Fully qualified service name, e.g. `greet.GreetService`.
    pub name: &'static str,
    /// Methods in declaration order.
    pub methods: &'static [MethodDescriptor],
}

impl ServiceDescriptor {
    /// Creates a service descriptor.
    pub const fn new(name: &'static str, methods: &'static [MethodDescriptor]) -> Self {
        Self { name, methods }
    }

    /// Looks up a method by full path.
    pub fn method(&self, path: &str) -> Option<&'static MethodDescriptor> {
        self.methods.iter().find(|m| m.path == path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_limits_per_shape() {
        assert_eq!(MethodShape::Unary.client_send_limit(), Some(1));
        assert_eq!(MethodShape::Unary.server_send_limit(), Some(1));
        assert_eq!(MethodShape::ServerStream.client_send_limit(), Some(1));
        assert_eq!(MethodShape::ServerStream.server_send_limit(), None);
        assert_eq!(MethodShape::ClientStream.client_send_limit(), None);
        assert_eq!(MethodShape::ClientStream.server_send_limit(), Some(1));
        assert!(MethodShape::BidiStream.is_client_streaming());
        assert!(MethodShape::BidiStream.is_server_streaming());
    }

    #[test]
    fn test_method_name() {
        let m = MethodDescriptor::new("/a.B/C", MethodShape::Unary, "Req", "Resp");
        assert_eq!(m.method_name(), "C");
        assert_eq!(m.to_string(), "/a.B/C (unary)");
    }

    #[test]
    fn test_service_lookup_is_exact() {
        const METHODS: &[MethodDescriptor] = &[
            MethodDescriptor::new("/a.B/C", MethodShape::Unary, "Req", "Resp"),
            MethodDescriptor::new("/a.B/D", MethodShape::BidiStream, "Req", "Resp"),
        ];
        let service = ServiceDescriptor::new("a.B", METHODS);
        assert!(service.method("/a.B/D").is_some());
        assert!(service.method("/a.B/c").is_none());
        assert!(service.method("C").is_none());
    }
}
