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

use crate::call::{CallContext, CallError, MethodDescriptor, Status};
use crate::client::CallOptions;
use crate::config::ClientConfig;
use crate::connection::{Connection, ConnectionConfig};
use crate::observability::{CallMetrics, log_status};
use crate::session::{MessageSink, MessageStream, StreamSession};
use crate::transport::{TlsConfig, Transport, TransportError, secure};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

#[cfg(feature = "observability")]
use tracing::instrument;

/// Opens calls on one connection.
///
/// Every invoker returns the call's outcome as a [`Status`] error when the
/// call does not complete with `OK`. Use [`Status::is_retryable`],
/// [`Status::is_cancelled`] and [`Status::is_fatal`] to decide what to do
/// next.
///
/// Cloning is cheap; clones share the connection.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use streamrpc::client::{CallOptions, Client};
/// use streamrpc::config::ServerConfig;
/// use streamrpc::connection::ConnectionConfig;
/// use streamrpc::greet::{GREET, GreetRequest, GreetResponse, GreetService, Greeting};
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
/// let client = Client::new(client_side, ConnectionConfig::default());
/// let options = CallOptions::new().with_timeout(Duration::from_secs(5));
/// let reply: GreetResponse = client
///     .unary(&GREET, &GreetRequest::from(Greeting::first("Pavan")), options)
///     .await?;
/// assert_eq!(reply.result, "Hello Pavan");
/// # Ok(())
/// # }
/// ```
///
/// Over TLS, [`Client::connect`] dials the address in a [`ClientConfig`].
#[derive(Clone)]
pub struct Client {
    connection: Connection,
    default_timeout: Option<Duration>,
    metrics: Arc<CallMetrics>,
}

impl Client {
    /// Creates a client over an established transport.
    pub fn new<T: Transport>(transport: T, config: ConnectionConfig) -> Self {
        Self {
            connection: Connection::client(transport, config),
            default_timeout: None,
            metrics: Arc::new(CallMetrics::new()),
        }
    }

    /// Connects securely as described by `config`.
    ///
    /// # Errors
    ///
    /// - [`TransportError::InvalidCertificate`] if the CA file is unusable
    /// - [`TransportError::ConnectionFailed`] if the server is unreachable
    /// - [`TransportError::HandshakeFailed`] if the server cannot be
    ///   authenticated
    pub async fn connect(config: &ClientConfig) -> Result<Self, TransportError> {
        let trust_anchor = TlsConfig::client_from_ca_file(&config.ca_path, &config.server_name)?;
        let transport = secure::connect(&config.server_address, trust_anchor).await?;
        Ok(Self::new(transport, config.connection_config())
            .with_default_timeout(config.default_timeout()))
    }

    /// Sets the timeout for calls opened without a deadline.
    pub fn with_default_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// The underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Counters for calls opened by this client and its clones.
    pub fn metrics(&self) -> Arc<CallMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Opens a call and returns its session for manual driving.
    ///
    /// # Errors
    ///
    /// Returns `DEADLINE_EXCEEDED` without contacting the server if the
    /// deadline has already passed, and `UNAVAILABLE` if the connection is
    /// closed.
    #[cfg_attr(
        feature = "observability",
        instrument(skip(self, options), fields(method = method.path))
    )]
    pub async fn open(
        &self,
        method: &MethodDescriptor,
        options: CallOptions,
    ) -> Result<StreamSession, Status> {
        let now = Instant::now();
        let deadline = options
            .deadline
            .map(|deadline| deadline.resolve(now))
            .or_else(|| self.default_timeout.map(|timeout| now + timeout));

        self.metrics.record_call_started(method.path);
        let (context, channel) = match self
            .connection
            .open_call(method.path, deadline, options.metadata)
            .await
        {
            Ok(opened) => opened,
            Err(status) => {
                self.metrics.record_call_finished(method.path, &status);
                log_status(method.path, &status);
                return Err(status);
            }
        };

        tokio::spawn(record_outcome(context.clone(), Arc::clone(&self.metrics)));
        Ok(StreamSession::new(
            self.connection.clone(),
            context,
            channel,
            method.shape,
            Arc::clone(&self.metrics),
        ))
    }

    /// Sends one request and waits for the single response.
    pub async fn unary<Req, Resp>(
        &self,
        method: &MethodDescriptor,
        request: &Req,
        options: CallOptions,
    ) -> Result<Resp, Status>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let (sender, receiver) = self.open(method, options).await?.split();
        let mut requests = MessageSink::<Req>::new(sender);
        let mut responses = MessageStream::<Resp>::new(receiver);

        requests.send(request).await?;
        requests.close().await?;
        single_response(&mut responses).await
    }

    /// Sends one request and returns the stream of responses.
    ///
    /// The stream yields responses in the order the server sent them and
    /// ends after the last one. Dropping it early cancels the call.
    pub async fn server_streaming<Req, Resp>(
        &self,
        method: &MethodDescriptor,
        request: &Req,
        options: CallOptions,
    ) -> Result<MessageStream<Resp>, Status>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let (sender, receiver) = self.open(method, options).await?.split();
        let mut requests = MessageSink::<Req>::new(sender);
        requests.send(request).await?;
        requests.close().await?;
        Ok(MessageStream::new(receiver))
    }

    /// Sends every request from `requests` in order, then waits for the
    /// single aggregate response.
    ///
    /// `requests` may pace itself; the call ends early if the server fails or
    /// the deadline passes while the next request is pending.
    pub async fn client_streaming<Req, Resp, S>(
        &self,
        method: &MethodDescriptor,
        requests: S,
        options: CallOptions,
    ) -> Result<Resp, Status>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
        S: Stream<Item = Req>,
    {
        let session = self.open(method, options).await?;
        let context = session.context().clone();
        let (sender, receiver) = session.split();
        let mut sink = MessageSink::<Req>::new(sender);
        let mut responses = MessageStream::<Resp>::new(receiver);

        tokio::pin!(requests);
        loop {
            let next = tokio::select! {
                biased;
                status = context.cancelled() => return Err(status),
                next = requests.next() => next,
            };
            let Some(request) = next else {
                break;
            };
            match sink.send(&request).await {
                Ok(()) => {}
                // The server answered early; its status is waiting behind any response.
                Err(CallError::StreamClosed) => break,
                Err(error) => return Err(error.into()),
            }
        }
        sink.close().await?;
        single_response(&mut responses).await
    }

    /// Runs a bidirectional call.
    ///
    /// One task sends `requests` as they become ready and half-closes when
    /// the stream ends. Meanwhile every response is passed to `on_response`
    /// in arrival order. Returns only after both directions are finished.
    ///
    /// If both directions fail, the error seen by the receiving direction is
    /// returned since it carries the call's final status.
    pub async fn bidi_streaming<Req, Resp, S, F>(
        &self,
        method: &MethodDescriptor,
        requests: S,
        options: CallOptions,
        mut on_response: F,
    ) -> Result<(), Status>
    where
        Req: Serialize + Send + Sync + 'static,
        Resp: DeserializeOwned,
        S: Stream<Item = Req> + Send + 'static,
        F: FnMut(Resp),
    {
        let session = self.open(method, options).await?;
        let context = session.context().clone();
        let _guard = CancelOnDrop(context.clone());
        let (sender, receiver) = session.split();

        let outbound = tokio::spawn(send_all(context, MessageSink::new(sender), requests));

        let mut responses = MessageStream::<Resp>::new(receiver);
        let inbound = async {
            while let Some(response) = responses.message().await? {
                on_response(response);
            }
            Ok::<(), CallError>(())
        }
        .await;

        let outbound = match outbound.await {
            Ok(result) => result.map_err(Status::from),
            Err(e) if e.is_panic() => Err(Status::internal("request stream panicked")),
            Err(_) => Err(Status::cancelled("request stream aborted")),
        };

        inbound.map_err(Status::from)?;
        outbound
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("connection", &self.connection)
            .field("default_timeout", &self.default_timeout)
            .finish()
    }
}

/// Cancels a call whose invoker is dropped before it returns.
struct CancelOnDrop(CallContext);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if !self.0.is_finished() {
            self.0
                .finish(Status::cancelled("call dropped before completion"));
        }
    }
}

async fn single_response<Resp: DeserializeOwned>(
    responses: &mut MessageStream<Resp>,
) -> Result<Resp, Status> {
    let response = responses
        .message()
        .await?
        .ok_or_else(|| Status::internal("server sent no response"))?;
    match responses.message().await? {
        None => Ok(response),
        Some(_) => Err(Status::internal("server sent more than one response")),
    }
}

/// Outbound half of a bidirectional call.
async fn send_all<Req, S>(
    context: CallContext,
    mut sink: MessageSink<Req>,
    requests: S,
) -> Result<(), CallError>
where
    Req: Serialize + Send + Sync,
    S: Stream<Item = Req> + Send,
{
    tokio::pin!(requests);
    loop {
        let next = tokio::select! {
            biased;
            status = context.done() => {
                // The server may finish before reading every request.
                if status.is_ok() {
                    return Ok(());
                }
                return Err(CallError::Status(status));
            }
            next = requests.next() => next,
        };
        let Some(request) = next else {
            break;
        };
        match sink.send(&request).await {
            Ok(()) => {}
            // The receiving direction reports how the server finished.
            Err(CallError::StreamClosed) => return Ok(()),
            Err(error) => return Err(error),
        }
    }
    sink.close().await
}

async fn record_outcome(context: CallContext, metrics: Arc<CallMetrics>) {
    let status = context.done().await;
    debug!(call_id = %context.id(), code = %status.code(), "Call finished");
    metrics.record_call_finished(context.method(), &status);
    log_status(context.method(), &status);
}
