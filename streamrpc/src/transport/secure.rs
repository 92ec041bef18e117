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

//! Secure channel establishment: TLS over TCP.
//!
//! [`connect`] and [`listen`] are the two entry points used by the client and
//! server. Both fail closed: if certificate material or peer authentication
//! is bad, no transport is returned and the error is a security failure
//! ([`TransportError::is_security_failure`]) rather than a connection failure.

use crate::transport::{
    TcpTransport, TcpTransportListener, TlsConfig, TlsTransport, Transport, TransportError,
    TransportListener,
};
use std::io;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// A TLS-wrapped TCP transport.
pub type SecureTransport = TlsTransport<TcpTransport>;

/// Default upper bound on a server-side TLS handshake.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Completed handshakes that may wait for [`TransportListener::accept`].
const HANDSHAKEN_BACKLOG: usize = 16;

/// Connects to `address` and authenticates the server with `trust_anchor`.
///
/// `trust_anchor` must be a client configuration, normally built with
/// [`TlsConfig::client_from_ca_pem`] or [`TlsConfig::client_from_ca_file`].
///
/// Dialling and the handshake together must finish within
/// [`DEFAULT_HANDSHAKE_TIMEOUT`].
///
/// # Errors
///
/// - [`TransportError::ConnectionFailed`] if the TCP connection cannot be made
/// - [`TransportError::HandshakeFailed`] if the server cannot be authenticated
/// - [`TransportError::Timeout`] if the server does not answer in time
pub async fn connect(
    address: impl Into<String>,
    trust_anchor: TlsConfig,
) -> Result<SecureTransport, TransportError> {
    let address = address.into();
    let establish = async {
        let tcp = TcpTransport::connect(address.clone()).await?;
        TlsTransport::connect(tcp, trust_anchor).await
    };
    let tls = tokio::time::timeout(DEFAULT_HANDSHAKE_TIMEOUT, establish)
        .await
        .map_err(|_| TransportError::Timeout {
            operation: "secure connect",
            duration: DEFAULT_HANDSHAKE_TIMEOUT,
        })??;
    info!(%address, transport_id = %tls.metadata().id, "Secure channel established");
    Ok(tls)
}

/// Binds `address` and returns an acceptor that serves the given certificate.
///
/// `certificate` and `private_key` are PEM encoded.
///
/// # Errors
///
/// - [`TransportError::InvalidCertificate`] if the PEM material is unusable
/// - [`TransportError::BindFailed`] if the address cannot be bound
pub async fn listen(
    address: impl Into<String>,
    certificate: &[u8],
    private_key: &[u8],
) -> Result<SecureAcceptor, TransportError> {
    // Validate certificate material before taking the port.
    let tls = TlsConfig::server_from_pem(certificate, private_key)?;
    listen_with_config(address, tls).await
}

/// Binds `address` using an already built server [`TlsConfig`].
pub async fn listen_with_config(
    address: impl Into<String>,
    tls: TlsConfig,
) -> Result<SecureAcceptor, TransportError> {
    if !matches!(tls, TlsConfig::Server { .. }) {
        return Err(TransportError::wrong_tls_role("server"));
    }
    let listener = TcpTransport::bind(address).await?;
    let local_addr = listener.local_addr()?;
    Ok(SecureAcceptor {
        local_addr,
        handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        pipeline: Mutex::new(Pipeline::Idle { listener, tls }),
    })
}

/// Accepts TCP connections and completes the TLS handshake on each.
///
/// Handshakes run concurrently in a background task started by the first
/// [`accept`], so a client that connects and then stalls only holds up its
/// own connection. A client that fails or times out the handshake is logged
/// and skipped; [`accept`] keeps waiting for the next connection instead of
/// returning the error.
///
/// Dropping the acceptor stops accepting and abandons handshakes in flight.
///
/// [`accept`]: TransportListener::accept
#[derive(Debug)]
pub struct SecureAcceptor {
    local_addr: SocketAddr,
    handshake_timeout: Duration,
    pipeline: Mutex<Pipeline>,
}

#[derive(Debug)]
enum Pipeline {
    Idle {
        listener: TcpTransportListener,
        tls: TlsConfig,
    },
    Running {
        handshaken: mpsc::Receiver<Result<SecureTransport, TransportError>>,
        task: JoinHandle<()>,
    },
    Stopped,
}

impl SecureAcceptor {
    /// Sets the maximum time a client may take to complete the handshake.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

impl Drop for SecureAcceptor {
    fn drop(&mut self) {
        if let Pipeline::Running { task, .. } = self.pipeline.get_mut() {
            task.abort();
        }
    }
}

impl Pipeline {
    /// Starts the handshake task unless it is already running.
    fn start(&mut self, handshake_timeout: Duration) {
        match std::mem::replace(self, Pipeline::Stopped) {
            Pipeline::Idle { listener, tls } => {
                let (ready, handshaken) = mpsc::channel(HANDSHAKEN_BACKLOG);
                let task = tokio::spawn(run_handshakes(listener, tls, handshake_timeout, ready));
                *self = Pipeline::Running { handshaken, task };
            }
            other => *self = other,
        }
    }
}

fn acceptor_stopped() -> TransportError {
    TransportError::Io(io::Error::new(
        io::ErrorKind::NotConnected,
        "secure acceptor stopped",
    ))
}

#[async_trait::async_trait]
impl TransportListener for SecureAcceptor {
    type Transport = SecureTransport;

    async fn accept(&self) -> Result<SecureTransport, TransportError> {
        let mut pipeline = self.pipeline.lock().await;
        pipeline.start(self.handshake_timeout);
        match &mut *pipeline {
            Pipeline::Running { handshaken, .. } => handshaken
                .recv()
                .await
                .unwrap_or_else(|| Err(acceptor_stopped())),
            _ => Err(acceptor_stopped()),
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        Ok(self.local_addr)
    }
}

/// Accepts TCP connections and hands each finished handshake to `ready`.
async fn run_handshakes(
    listener: TcpTransportListener,
    tls: TlsConfig,
    handshake_timeout: Duration,
    ready: mpsc::Sender<Result<SecureTransport, TransportError>>,
) {
    let mut handshakes = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(tcp) => {
                    handshakes.spawn(handshake(tcp, tls.clone(), handshake_timeout));
                }
                Err(e) => {
                    if ready.send(Err(e)).await.is_err() {
                        break;
                    }
                }
            },
            Some(finished) = handshakes.join_next() => match finished {
                Ok(Some(transport)) => {
                    if ready.send(Ok(transport)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Handshake task failed"),
            },
            _ = ready.closed() => break,
        }
    }
    debug!(in_flight = handshakes.len(), "Secure acceptor stopped");
}

async fn handshake(
    tcp: TcpTransport,
    tls: TlsConfig,
    handshake_timeout: Duration,
) -> Option<SecureTransport> {
    let peer = tcp.metadata().peer_addr;
    match tokio::time::timeout(handshake_timeout, TlsTransport::accept(tcp, tls)).await {
        Ok(Ok(transport)) => {
            info!(?peer, "Accepted secure connection");
            Some(transport)
        }
        Ok(Err(e)) => {
            warn!(?peer, error = %e, "Rejected connection: TLS handshake failed");
            None
        }
        Err(_) => {
            warn!(?peer, timeout = ?handshake_timeout, "Rejected connection: TLS handshake timed out");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    fn localhost_cert() -> (String, String) {
        let rcgen::CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        (cert.pem(), key_pair.serialize_pem())
    }

    #[tokio::test]
    async fn test_secure_round_trip() {
        let (cert, key) = localhost_cert();
        let acceptor = listen("127.0.0.1:0", cert.as_bytes(), key.as_bytes())
            .await
            .unwrap();
        let addr = acceptor.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let mut transport = acceptor.accept().await.unwrap();
            let mut buffer = [0u8; 5];
            transport.read_exact(&mut buffer).await.unwrap();
            transport.write_all(&buffer).await.unwrap();
            transport.flush().await.unwrap();
        });

        let trust = TlsConfig::client_from_ca_pem(cert.as_bytes(), "localhost").unwrap();
        let mut client = connect(addr.to_string(), trust).await.unwrap();
        client.write_all(b"hello").await.unwrap();
        client.flush().await.unwrap();

        let mut buffer = [0u8; 5];
        client.read_exact(&mut buffer).await.unwrap();
        assert_eq!(&buffer, b"hello");
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_untrusted_server_fails_closed() {
        let (cert, key) = localhost_cert();
        let (other_ca, _) = localhost_cert();
        let acceptor = listen("127.0.0.1:0", cert.as_bytes(), key.as_bytes())
            .await
            .unwrap();
        let addr = acceptor.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = acceptor.accept().await;
        });

        let trust = TlsConfig::client_from_ca_pem(other_ca.as_bytes(), "localhost").unwrap();
        let error = connect(addr.to_string(), trust).await.err().unwrap();
        assert!(error.is_security_failure());
        assert!(matches!(error, TransportError::HandshakeFailed { .. }));
    }

    #[tokio::test]
    async fn test_silent_peer_does_not_block_other_handshakes() {
        let (cert, key) = localhost_cert();
        let acceptor = listen("127.0.0.1:0", cert.as_bytes(), key.as_bytes())
            .await
            .unwrap();
        let addr = acceptor.local_addr().unwrap();

        // Connects first and never says a word.
        let _silent = tokio::net::TcpStream::connect(addr).await.unwrap();

        let server = tokio::spawn(async move {
            let transport = acceptor.accept().await.unwrap();
            (transport.metadata().peer_addr, acceptor)
        });

        let trust = TlsConfig::client_from_ca_pem(cert.as_bytes(), "localhost").unwrap();
        let client = tokio::time::timeout(Duration::from_secs(3), connect(addr.to_string(), trust))
            .await
            .expect("handshake stalled behind a silent peer")
            .unwrap();

        let (peer, _acceptor) = tokio::time::timeout(Duration::from_secs(3), server)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(peer, client.metadata().local_addr);
    }

    #[tokio::test]
    async fn test_stalled_handshake_is_dropped() {
        let (cert, key) = localhost_cert();
        let acceptor = listen("127.0.0.1:0", cert.as_bytes(), key.as_bytes())
            .await
            .unwrap()
            .with_handshake_timeout(Duration::from_millis(50));
        let addr = acceptor.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = acceptor.accept().await;
        });

        let mut silent = tokio::net::TcpStream::connect(addr).await.unwrap();
        let mut buffer = [0u8; 1];
        let read = tokio::time::timeout(Duration::from_secs(2), silent.read(&mut buffer))
            .await
            .unwrap();
        assert!(matches!(read, Ok(0) | Err(_)));
    }

    #[tokio::test]
    async fn test_listen_rejects_bad_pem_before_binding() {
        let error = listen("127.0.0.1:0", b"not a cert", b"not a key")
            .await
            .unwrap_err();
        assert!(matches!(error, TransportError::InvalidCertificate { .. }));
    }

    #[tokio::test]
    async fn test_connection_failure_is_not_security_failure() {
        let (cert, _) = localhost_cert();
        let trust = TlsConfig::client_from_ca_pem(cert.as_bytes(), "localhost").unwrap();
        let error = connect("127.0.0.1:1", trust).await.err().unwrap();
        assert!(matches!(error, TransportError::ConnectionFailed { .. }));
        assert!(!error.is_security_failure());
    }
}
