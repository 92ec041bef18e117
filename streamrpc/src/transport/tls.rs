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

//! TLS transport implementation for secure communication.
//!
//! This module wraps any [`Transport`] in TLS using `tokio-rustls`. Clients
//! authenticate the server against an explicit trust anchor (a CA certificate
//! in PEM form); there is no "accept anything" mode, so a certificate that
//! does not chain to the anchor always fails the handshake.
//!
//! # Examples
//!
//! ```rust,no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use streamrpc::transport::{TcpTransport, TlsConfig, TlsTransport};
//!
//! let ca = std::fs::read("ssl/ca.crt")?;
//! let config = TlsConfig::client_from_ca_pem(&ca, "localhost")?;
//! let tcp = TcpTransport::connect("localhost:50051").await?;
//! let tls = TlsTransport::connect(tcp, config).await?;
//! # Ok(())
//! # }
//! ```

use crate::transport::{Transport, TransportError, TransportMetadata};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::{TlsAcceptor, TlsConnector, TlsStream};
use tracing::{debug, warn};

/// TLS configuration for client and server modes.
#[derive(Clone)]
pub enum TlsConfig {
    /// Client configuration with the server name used for SNI and verification.
    Client {
        /// TLS connector
        connector: Arc<TlsConnector>,
        /// Server name for SNI
        server_name: ServerName<'static>,
    },
    /// Server configuration with certificates.
    Server {
        /// TLS acceptor
        acceptor: Arc<TlsAcceptor>,
    },
}

impl TlsConfig {
    /// Creates a client configuration trusting only the CA certificates in `ca_pem`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidCertificate`] if the PEM holds no
    /// usable certificate, or [`TransportError::InvalidConfiguration`] if the
    /// server name is not a valid DNS name or IP address.
    pub fn client_from_ca_pem(ca_pem: &[u8], server_name: &str) -> Result<Self, TransportError> {
        let mut roots = rustls::RootCertStore::empty();
        for cert in parse_certificates(ca_pem)? {
            roots.add(cert).map_err(|e| {
                TransportError::invalid_certificate(format!("rejected trust anchor: {}", e))
            })?;
        }

        let config = rustls::ClientConfig::builder_with_provider(crypto_provider())
            .with_safe_default_protocol_versions()
            .map_err(|e| TransportError::InvalidConfiguration {
                reason: e.to_string(),
            })?
            .with_root_certificates(roots)
            .with_no_client_auth();

        let server_name = ServerName::try_from(server_name.to_string()).map_err(|e| {
            TransportError::InvalidConfiguration {
                reason: format!("invalid server name '{}': {}", server_name, e),
            }
        })?;

        Ok(Self::Client {
            connector: Arc::new(TlsConnector::from(Arc::new(config))),
            server_name,
        })
    }

    /// Reads a PEM trust anchor from disk and builds a client configuration.
    pub fn client_from_ca_file(
        path: impl AsRef<Path>,
        server_name: &str,
    ) -> Result<Self, TransportError> {
        let ca_pem = read_pem_file(path.as_ref())?;
        Self::client_from_ca_pem(&ca_pem, server_name)
    }

    /// Creates a server configuration from a PEM certificate chain and private key.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidCertificate`] if the certificate or key
    /// cannot be parsed, or if they do not belong together.
    pub fn server_from_pem(cert_pem: &[u8], key_pem: &[u8]) -> Result<Self, TransportError> {
        let certs = parse_certificates(cert_pem)?;
        let key = parse_private_key(key_pem)?;

        let config = rustls::ServerConfig::builder_with_provider(crypto_provider())
            .with_safe_default_protocol_versions()
            .map_err(|e| TransportError::InvalidConfiguration {
                reason: e.to_string(),
            })?
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| TransportError::invalid_certificate(e.to_string()))?;

        Ok(Self::Server {
            acceptor: Arc::new(TlsAcceptor::from(Arc::new(config))),
        })
    }

    /// Reads the certificate chain and private key from disk and builds a server configuration.
    pub fn server_from_files(
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
    ) -> Result<Self, TransportError> {
        let cert_pem = read_pem_file(cert_path.as_ref())?;
        let key_pem = read_pem_file(key_path.as_ref())?;
        Self::server_from_pem(&cert_pem, &key_pem)
    }
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client { server_name, .. } => f
                .debug_struct("TlsConfig::Client")
                .field("server_name", server_name)
                .finish(),
            Self::Server { .. } => f.debug_struct("TlsConfig::Server").finish(),
        }
    }
}

fn crypto_provider() -> Arc<rustls::crypto::CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

fn read_pem_file(path: &Path) -> Result<Vec<u8>, TransportError> {
    std::fs::read(path).map_err(|e| {
        TransportError::invalid_certificate(format!("cannot read {}: {}", path.display(), e))
    })
}

fn parse_certificates(pem: &[u8]) -> Result<Vec<CertificateDer<'static>>, TransportError> {
    let certs = rustls_pemfile::certs(&mut &pem[..])
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| TransportError::invalid_certificate(e.to_string()))?;

    if certs.is_empty() {
        return Err(TransportError::invalid_certificate(
            "no certificates found in PEM input",
        ));
    }
    Ok(certs)
}

fn parse_private_key(pem: &[u8]) -> Result<PrivateKeyDer<'static>, TransportError> {
    rustls_pemfile::private_key(&mut &pem[..])
        .map_err(|e| TransportError::invalid_certificate(e.to_string()))?
        .ok_or_else(|| TransportError::invalid_certificate("no private key found"))
}

/// A transport wrapper that adds TLS encryption.
pub struct TlsTransport<T> {
    stream: TlsStream<T>,
    metadata: TransportMetadata,
}

impl<T> TlsTransport<T>
where
    T: Transport,
{
    /// Performs the client side of the TLS handshake over `transport`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::HandshakeFailed`] if the server certificate is
    /// not trusted or the handshake fails for any other reason.
    pub async fn connect(transport: T, config: TlsConfig) -> Result<Self, TransportError> {
        let (connector, server_name) = match config {
            TlsConfig::Client {
                connector,
                server_name,
            } => (connector, server_name),
            TlsConfig::Server { .. } => {
                return Err(TransportError::wrong_tls_role("client"));
            }
        };

        let metadata = transport.metadata().secured();
        let peer = server_name.to_str().into_owned();
        let client_stream = connector
            .connect(server_name, transport)
            .await
            .map_err(|source| {
                warn!(%peer, error = %source, "TLS handshake failed");
                TransportError::HandshakeFailed { peer, source }
            })?;

        debug!(transport_id = %metadata.id, "TLS client handshake complete");

        Ok(Self {
            stream: TlsStream::Client(client_stream),
            metadata,
        })
    }

    /// Performs the server side of the TLS handshake over `transport`.
    pub async fn accept(transport: T, config: TlsConfig) -> Result<Self, TransportError> {
        let acceptor = match config {
            TlsConfig::Server { acceptor } => acceptor,
            TlsConfig::Client { .. } => {
                return Err(TransportError::wrong_tls_role("server"));
            }
        };

        let metadata = transport.metadata().secured();
        let peer = metadata
            .peer_addr
            .map(|addr| addr.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        let server_stream = acceptor
            .accept(transport)
            .await
            .map_err(|source| TransportError::HandshakeFailed { peer, source })?;

        debug!(transport_id = %metadata.id, "TLS server handshake complete");

        Ok(Self {
            stream: TlsStream::Server(server_stream),
            metadata,
        })
    }
}

impl<T> Transport for TlsTransport<T>
where
    T: Transport,
{
    fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }
}

forward_async_io!(TlsTransport<T: Transport>);

#[cfg(test)]
mod tests {
    use super::*;

    fn self_signed() -> (String, String) {
        let rcgen::CertifiedKey { cert, key_pair } =
            rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        (cert.pem(), key_pair.serialize_pem())
    }

    #[test]
    fn test_client_config_debug() {
        let (cert, _) = self_signed();
        let config = TlsConfig::client_from_ca_pem(cert.as_bytes(), "localhost").unwrap();
        assert!(format!("{:?}", config).contains("TlsConfig::Client"));
    }

    #[test]
    fn test_empty_trust_anchor_rejected() {
        let result = TlsConfig::client_from_ca_pem(b"", "localhost");
        assert!(matches!(
            result,
            Err(TransportError::InvalidCertificate { .. })
        ));
    }

    #[test]
    fn test_server_config_requires_key() {
        let (cert, _) = self_signed();
        let result = TlsConfig::server_from_pem(cert.as_bytes(), b"");
        assert!(matches!(
            result,
            Err(TransportError::InvalidCertificate { .. })
        ));
    }

    #[test]
    fn test_server_config_from_pem() {
        let (cert, key) = self_signed();
        let config = TlsConfig::server_from_pem(cert.as_bytes(), key.as_bytes()).unwrap();
        assert!(matches!(config, TlsConfig::Server { .. }));
    }

    #[tokio::test]
    async fn test_handshake_over_memory_pair() {
        use crate::transport::{MemoryTransport, TransportKind};
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let (cert, key) = self_signed();
        let client_config = TlsConfig::client_from_ca_pem(cert.as_bytes(), "localhost").unwrap();
        let server_config = TlsConfig::server_from_pem(cert.as_bytes(), key.as_bytes()).unwrap();
        let (client_side, server_side) = MemoryTransport::pair_default();
        let plain_id = client_side.metadata().id;

        let (client, server) = tokio::join!(
            TlsTransport::connect(client_side, client_config),
            TlsTransport::accept(server_side, server_config),
        );
        let (mut client, mut server) = (client.unwrap(), server.unwrap());
        assert_eq!(client.metadata().id, plain_id);
        assert_eq!(client.metadata().kind, TransportKind::Tls);

        client.write_all(b"sealed").await.unwrap();
        client.flush().await.unwrap();
        let mut buffer = [0u8; 6];
        server.read_exact(&mut buffer).await.unwrap();
        assert_eq!(&buffer, b"sealed");
    }

    #[tokio::test]
    async fn test_wrong_role_is_rejected() {
        use crate::transport::MemoryTransport;

        let (cert, key) = self_signed();
        let server_config = TlsConfig::server_from_pem(cert.as_bytes(), key.as_bytes()).unwrap();
        let (client_side, _server_side) = MemoryTransport::pair_default();
        let error = TlsTransport::connect(client_side, server_config)
            .await
            .err()
            .unwrap();
        assert!(matches!(error, TransportError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_missing_file_is_invalid_certificate() {
        let result = TlsConfig::server_from_files("/nonexistent/server.crt", "/nonexistent/key");
        assert!(result.unwrap_err().is_security_failure());
    }
}
