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

use crate::config::ServerConfig;
use crate::connection::Connection;
use crate::observability::CallMetrics;
use crate::server::dispatcher::Dispatcher;
use crate::server::service::{Router, Service, ServiceError};
use crate::transport::{SecureAcceptor, TlsConfig, Transport, TransportError, TransportListener};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Pause after a failed accept before trying again.
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Serves registered services on every connection accepted from a listener.
///
/// # Examples
///
/// Any [`Transport`] can be served directly, which is how tests drive a
/// server without sockets:
///
/// ```rust
/// use streamrpc::client::{CallOptions, Client};
/// use streamrpc::config::ServerConfig;
/// use streamrpc::connection::ConnectionConfig;
/// use streamrpc::greet::{GreetClient, GreetService, Greeting};
/// use streamrpc::server::Server;
/// use streamrpc::transport::MemoryTransport;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let server = Server::new(ServerConfig::new())
///     .add_service(GreetService::default().into_service()?)?;
/// let (client_side, server_side) = MemoryTransport::pair_default();
/// server.serve_connection(server_side);
///
/// let greet = GreetClient::new(Client::new(client_side, ConnectionConfig::default()));
/// let reply = greet.greet(Greeting::first("Roy"), CallOptions::new()).await?;
/// assert_eq!(reply, "Hello Roy");
/// # Ok(())
/// # }
/// ```
///
/// Serving TLS connections until Ctrl-C:
///
/// ```rust,no_run
/// use streamrpc::config::ServerConfig;
/// use streamrpc::greet::GreetService;
/// use streamrpc::server::Server;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ServerConfig::new();
/// let server = Server::new(config).add_service(GreetService::default().into_service()?)?;
/// let listener = server.bind().await?;
/// server.serve_with_shutdown(listener, async {
///     let _ = tokio::signal::ctrl_c().await;
/// }).await;
/// # Ok(())
/// # }
/// ```
pub struct Server {
    config: ServerConfig,
    router: Arc<Router>,
    metrics: Arc<CallMetrics>,
}

impl Server {
    /// Creates a server with no services other than reflection, if enabled.
    pub fn new(config: ServerConfig) -> Self {
        let mut router = Router::default();
        if config.reflection {
            router.refresh_reflection();
        }
        Self {
            config,
            router: Arc::new(router),
            metrics: Arc::new(CallMetrics::new()),
        }
    }

    /// Registers a service.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::DuplicateMethod`] if one of the service's
    /// methods is already served.
    pub fn add_service(mut self, service: Service) -> Result<Self, ServiceError> {
        info!(service = service.descriptor().name, "Registering service");
        let router = Arc::make_mut(&mut self.router);
        router.add(service)?;
        if self.config.reflection {
            router.refresh_reflection();
        }
        Ok(self)
    }

    /// The server's configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Counters for every call this server has handled.
    pub fn metrics(&self) -> Arc<CallMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Loads the configured certificate and key, and binds the configured
    /// address.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidCertificate`] if the PEM files are
    /// missing or unusable, and [`TransportError::BindFailed`] if the address
    /// cannot be bound.
    pub async fn bind(&self) -> Result<SecureAcceptor, TransportError> {
        let tls =
            TlsConfig::server_from_files(&self.config.certificate_path, &self.config.private_key_path)?;
        let acceptor = crate::transport::secure::listen_with_config(&self.config.listen_address, tls)
            .await?
            .with_handshake_timeout(self.config.handshake_timeout());
        info!(address = %self.config.listen_address, "Listening");
        Ok(acceptor)
    }

    /// Serves connections from `listener` forever.
    pub async fn serve<L: TransportListener>(&self, listener: L) {
        self.serve_with_shutdown(listener, std::future::pending()).await;
    }

    /// Serves connections from `listener` until `signal` completes.
    ///
    /// Connections already accepted keep running until their peers
    /// disconnect.
    pub async fn serve_with_shutdown<L, S>(&self, listener: L, signal: S)
    where
        L: TransportListener,
        S: Future<Output = ()>,
    {
        match listener.local_addr() {
            Ok(address) => info!(%address, "Accepting connections"),
            Err(e) => warn!(error = %e, "Accepting connections on an unknown address"),
        }
        tokio::pin!(signal);
        loop {
            tokio::select! {
                _ = &mut signal => {
                    info!("Shutdown requested, no longer accepting connections");
                    return;
                }
                accepted = listener.accept() => match accepted {
                    Ok(transport) => {
                        self.serve_connection(transport);
                    }
                    Err(e) => {
                        warn!(error = %e, "Accept failed");
                        tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                    }
                },
            }
        }
    }

    /// Serves calls on one already established transport.
    ///
    /// The returned task ends when the connection closes.
    pub fn serve_connection<T: Transport>(&self, transport: T) -> JoinHandle<()> {
        let transport_id = transport.metadata().id;
        let peer = transport.metadata().peer_addr;
        let kind = transport.metadata().kind;
        let (connection, incoming) =
            Connection::server(transport, self.config.connection_config());
        let dispatcher = Dispatcher::new(
            Arc::clone(&self.router),
            Arc::clone(&self.metrics),
            self.config.max_concurrent_calls,
        );

        if !kind.is_secure() {
            debug!(%transport_id, %kind, "Serving calls over an unencrypted transport");
        }
        info!(%transport_id, ?peer, "Serving connection");
        tokio::spawn(async move {
            dispatcher.run(connection, incoming).await;
            info!(%transport_id, "Connection closed");
        })
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("listen_address", &self.config.listen_address)
            .field(
                "services",
                &self.router.services().iter().map(|s| s.name).collect::<Vec<_>>(),
            )
            .field("methods", &self.router.methods().count())
            .finish()
    }
}
