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

//! Transport layer abstractions.
//!
//! The [`Transport`] trait is the byte stream every connection runs over.
//! Calls never touch a transport directly; a [`Connection`] owns it and
//! multiplexes frames for many calls on top.
//!
//! - [`TcpTransport`]: TCP/IP networking
//! - [`TlsTransport`]: TLS over any other transport
//! - [`MemoryTransport`]: in-process pair for tests and benchmarks
//!
//! The [`secure`] module combines TCP and TLS into the secure channel used
//! by the greeting binaries.
//!
//! # Examples
//!
//! ```rust
//! use streamrpc::transport::{MemoryTransport, Transport, TransportKind};
//!
//! let (client, server) = MemoryTransport::pair_default();
//! assert_eq!(client.metadata().kind, TransportKind::Memory);
//! assert_ne!(client.metadata().id, server.metadata().id);
//! ```
//!
//! [`Connection`]: crate::connection::Connection

/// Implements `AsyncRead` and `AsyncWrite` for a wrapper by delegating to its
/// `stream` field.
macro_rules! forward_async_io {
    ($name:ident $(<$param:ident: $bound:path>)?) => {
        impl$(<$param: $bound>)? ::tokio::io::AsyncRead for $name$(<$param>)? {
            fn poll_read(
                mut self: ::std::pin::Pin<&mut Self>,
                cx: &mut ::std::task::Context<'_>,
                buf: &mut ::tokio::io::ReadBuf<'_>,
            ) -> ::std::task::Poll<::std::io::Result<()>> {
                ::tokio::io::AsyncRead::poll_read(::std::pin::Pin::new(&mut self.stream), cx, buf)
            }
        }

        impl$(<$param: $bound>)? ::tokio::io::AsyncWrite for $name$(<$param>)? {
            fn poll_write(
                mut self: ::std::pin::Pin<&mut Self>,
                cx: &mut ::std::task::Context<'_>,
                buf: &[u8],
            ) -> ::std::task::Poll<::std::io::Result<usize>> {
                ::tokio::io::AsyncWrite::poll_write(::std::pin::Pin::new(&mut self.stream), cx, buf)
            }

            fn poll_flush(
                mut self: ::std::pin::Pin<&mut Self>,
                cx: &mut ::std::task::Context<'_>,
            ) -> ::std::task::Poll<::std::io::Result<()>> {
                ::tokio::io::AsyncWrite::poll_flush(::std::pin::Pin::new(&mut self.stream), cx)
            }

            fn poll_shutdown(
                mut self: ::std::pin::Pin<&mut Self>,
                cx: &mut ::std::task::Context<'_>,
            ) -> ::std::task::Poll<::std::io::Result<()>> {
                ::tokio::io::AsyncWrite::poll_shutdown(::std::pin::Pin::new(&mut self.stream), cx)
            }
        }
    };
}

mod error;
mod memory;
pub mod secure;
mod tcp;
mod tls;
mod traits;
mod types;

pub use error::TransportError;
pub use memory::MemoryTransport;
pub use secure::{SecureAcceptor, SecureTransport};
pub use tcp::{TcpTransport, TcpTransportListener};
pub use tls::{TlsConfig, TlsTransport};
pub use traits::{Transport, TransportListener};
pub use types::{TransportId, TransportKind, TransportMetadata};
