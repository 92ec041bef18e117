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

use crate::transport::{TransportError, TransportMetadata};
use std::io;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncWrite};

/// A bidirectional byte stream that calls are multiplexed over.
///
/// Anything that is `AsyncRead + AsyncWrite` can be a transport; the trait adds
/// metadata for logging and a way to split into independently owned halves so
/// that one task reads while another writes.
pub trait Transport: AsyncRead + AsyncWrite + Send + Sync + Unpin + 'static {
    /// Returns metadata about this transport.
    fn metadata(&self) -> &TransportMetadata;

    /// Splits the transport into owned read and write halves.
    fn split(
        self,
    ) -> (
        Box<dyn AsyncRead + Send + Unpin>,
        Box<dyn AsyncWrite + Send + Unpin>,
    )
    where
        Self: Sized,
    {
        let (reader, writer) = tokio::io::split(self);
        (Box::new(reader), Box::new(writer))
    }
}

/// Server-side source of incoming transports.
#[async_trait::async_trait]
pub trait TransportListener: Send + Sync {
    /// The transport type produced by this listener.
    type Transport: Transport;

    /// Waits for the next fully established transport.
    async fn accept(&self) -> Result<Self::Transport, TransportError>;

    /// Returns the bound local address.
    fn local_addr(&self) -> io::Result<SocketAddr>;
}
