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

//! TCP transport implementation.
//!
//! Plain TCP is the byte stream underneath [`TlsTransport`](super::TlsTransport);
//! it is also usable on its own for tests and trusted networks.

use crate::transport::{
    Transport, TransportError, TransportKind, TransportListener, TransportMetadata,
};
use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info};

#[cfg(feature = "observability")]
use tracing::instrument;

/// TCP transport wrapping a Tokio [`TcpStream`].
///
/// # Examples
///
/// ```rust,no_run
/// use streamrpc::transport::{Transport, TcpTransport};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let transport = TcpTransport::connect("127.0.0.1:50051").await?;
/// println!("connected: {}", transport.metadata().id);
/// # Ok(())
/// # }
/// ```
pub struct TcpTransport {
    stream: TcpStream,
    metadata: TransportMetadata,
}

impl TcpTransport {
    /// Wraps an already connected stream.
    pub fn from_stream(stream: TcpStream) -> io::Result<Self> {
        // Frames are flushed one at a time; don't let Nagle hold them back.
        stream.set_nodelay(true)?;
        let metadata = TransportMetadata::new(TransportKind::Tcp)
            .with_addrs(Some(stream.local_addr()?), Some(stream.peer_addr()?));
        debug!(
            transport_id = %metadata.id,
            local = ?metadata.local_addr,
            peer = ?metadata.peer_addr,
            "Wrapped TCP stream"
        );
        Ok(Self { stream, metadata })
    }

    /// Dials `address`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionFailed`] if the connection cannot
    /// be established.
    #[cfg_attr(feature = "observability", instrument(skip_all, fields(address)))]
    pub async fn connect(address: impl Into<String>) -> Result<Self, TransportError> {
        let address = address.into();
        #[cfg(feature = "observability")]
        tracing::Span::current().record("address", address.as_str());
        let stream = match TcpStream::connect(&address).await {
            Ok(stream) => stream,
            Err(source) => return Err(TransportError::ConnectionFailed { address, source }),
        };
        info!(%address, "TCP connection established");
        Ok(Self::from_stream(stream)?)
    }

    /// Binds a listener on `address`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::BindFailed`] if the address cannot be bound.
    pub async fn bind(address: impl Into<String>) -> Result<TcpTransportListener, TransportError> {
        let address = address.into();
        let listener = match TcpListener::bind(&address).await {
            Ok(listener) => listener,
            Err(source) => return Err(TransportError::BindFailed { address, source }),
        };
        info!(%address, "TCP listener bound");
        Ok(TcpTransportListener { listener })
    }
}

impl Transport for TcpTransport {
    fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }
}

forward_async_io!(TcpTransport);

/// Listener producing plain [`TcpTransport`]s.
#[derive(Debug)]
pub struct TcpTransportListener {
    listener: TcpListener,
}

#[async_trait::async_trait]
impl TransportListener for TcpTransportListener {
    type Transport = TcpTransport;

    async fn accept(&self) -> Result<TcpTransport, TransportError> {
        let (stream, peer) = self.listener.accept().await?;
        debug!(%peer, "Accepted TCP connection");
        Ok(TcpTransport::from_stream(stream)?)
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::CallId;
    use crate::serialization::framing::{MAX_FRAME_SIZE, RawFrame};

    async fn loopback() -> (TcpTransport, TcpTransport) {
        let listener = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        let (client, server) = tokio::join!(TcpTransport::connect(address), listener.accept());
        (client.unwrap(), server.unwrap())
    }

    #[tokio::test]
    async fn test_frames_cross_the_socket() {
        let (mut client, mut server) = loopback().await;

        RawFrame::new(CallId::from(3), b"ping".to_vec())
            .write_to(&mut client, MAX_FRAME_SIZE)
            .await
            .unwrap();
        let frame = RawFrame::read_from(&mut server, MAX_FRAME_SIZE)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.call_id, CallId::from(3));
        assert_eq!(frame.payload, b"ping");

        drop(client);
        let end = RawFrame::read_from(&mut server, MAX_FRAME_SIZE).await.unwrap();
        assert!(end.is_none());
    }

    #[tokio::test]
    async fn test_both_ends_know_each_other() {
        let (client, server) = loopback().await;

        assert_eq!(client.metadata().kind, TransportKind::Tcp);
        assert!(!client.metadata().kind.is_secure());
        assert_eq!(client.metadata().peer_addr, server.metadata().local_addr);
        assert_eq!(server.metadata().peer_addr, client.metadata().local_addr);
        assert_ne!(client.metadata().id, server.metadata().id);
    }

    #[tokio::test]
    async fn test_refused_dial_names_the_address() {
        match TcpTransport::connect("127.0.0.1:1").await {
            Err(TransportError::ConnectionFailed { address, .. }) => {
                assert_eq!(address, "127.0.0.1:1");
            }
            other => panic!("expected ConnectionFailed, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_port_in_use() {
        let first = TcpTransport::bind("127.0.0.1:0").await.unwrap();
        let taken = first.local_addr().unwrap().to_string();

        let error = TcpTransport::bind(taken).await.unwrap_err();
        assert!(matches!(error, TransportError::BindFailed { .. }));
        assert!(!error.is_recoverable());
    }
}
