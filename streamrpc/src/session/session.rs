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

use crate::call::{CallContext, CallError, MethodShape, Status};
use crate::connection::{
    CALL_WINDOW, CallChannel, Connection, FrameKind, IncomingCall, ReceiveWindow, Role, SendWindow,
};
use crate::observability::CallMetrics;
use crate::serialization::Codec;
use crate::session::StreamState;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

#[cfg(feature = "observability")]
use tracing::instrument;

/// The message flow of one call.
///
/// A session is the only way to move messages for a call. It enforces the
/// legal transitions for the call's shape:
///
/// - [`send`](Self::send) is valid while the local direction is open and the
///   shape's message limit has not been reached; it suspends while the peer
///   has a full window of unread messages
/// - [`close_send`](Self::close_send) closes the local direction; calling it
///   again does nothing
/// - [`receive`](Self::receive) yields messages in send order, then `None`
///   once the peer closes its direction, or the terminal status as an error
///   if the call ends any other way
///
/// When send and receive must run concurrently, [`split`](Self::split) the
/// session into a [`SessionSender`] and a [`SessionReceiver`].
///
/// Dropping a client session before the call has finished cancels the call.
///
/// # Examples
///
/// ```rust
/// use streamrpc::client::{CallOptions, Client};
/// use streamrpc::config::ServerConfig;
/// use streamrpc::connection::ConnectionConfig;
/// use streamrpc::greet::{
///     GREET_EVERYONE, GreetEveryoneRequest, GreetEveryoneResponse, GreetService, Greeting,
/// };
/// use streamrpc::serialization::Serializer;
/// use streamrpc::server::Server;
/// use streamrpc::transport::MemoryTransport;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let server = Server::new(ServerConfig::new())
///     .add_service(GreetService::default().into_service()?)?;
/// let (client_side, server_side) = MemoryTransport::pair_default();
/// server.serve_connection(server_side);
/// let config = ConnectionConfig::default();
/// let codec = config.codec;
/// let client = Client::new(client_side, config);
///
/// let mut session = client.open(&GREET_EVERYONE, CallOptions::new()).await?;
/// for name in ["Stephane", "John"] {
///     let request = GreetEveryoneRequest::from(Greeting::first(name));
///     session.send(codec.serialize(&request)?).await?;
/// }
/// session.close_send().await?;
///
/// let mut replies = Vec::new();
/// while let Some(bytes) = session.receive().await? {
///     let reply: GreetEveryoneResponse = codec.deserialize(&bytes)?;
///     replies.push(reply.result);
/// }
/// assert_eq!(replies, ["Hello Stephane! ", "Hello John! "]);
/// # Ok(())
/// # }
/// ```
pub struct StreamSession {
    sender: SessionSender,
    receiver: SessionReceiver,
}

/// Sending half of a [`StreamSession`].
pub struct SessionSender {
    shared: Arc<Shared>,
    window: SendWindow,
    sent: u64,
    limit: Option<u64>,
}

/// Receiving half of a [`StreamSession`].
pub struct SessionReceiver {
    shared: Arc<Shared>,
    inbound: mpsc::Receiver<FrameKind>,
    window: ReceiveWindow,
    /// Credit consumed but not yet handed back to the peer.
    owed: u32,
    expected: u64,
}

struct Shared {
    connection: Connection,
    context: CallContext,
    role: Role,
    shape: MethodShape,
    metrics: Arc<CallMetrics>,
    send_closed: AtomicBool,
    recv_closed: AtomicBool,
}

impl Drop for Shared {
    fn drop(&mut self) {
        self.connection.deregister(self.context.id());
        if self.role == Role::Client && !self.context.is_finished() {
            debug!(call_id = %self.context.id(), "Session dropped before completion, cancelling");
            self.context
                .finish(Status::cancelled("call dropped before completion"));
        }
    }
}

impl StreamSession {
    pub(crate) fn new(
        connection: Connection,
        context: CallContext,
        channel: CallChannel,
        shape: MethodShape,
        metrics: Arc<CallMetrics>,
    ) -> Self {
        let role = connection.role();
        let limit = match role {
            Role::Client => shape.client_send_limit(),
            Role::Server => shape.server_send_limit(),
        };
        let shared = Arc::new(Shared {
            connection,
            context,
            role,
            shape,
            metrics,
            send_closed: AtomicBool::new(false),
            recv_closed: AtomicBool::new(false),
        });

        Self {
            sender: SessionSender {
                shared: Arc::clone(&shared),
                window: channel.send_window,
                sent: 0,
                limit,
            },
            receiver: SessionReceiver {
                shared,
                inbound: channel.inbound,
                window: ReceiveWindow::new(CALL_WINDOW),
                owed: 0,
                expected: 0,
            },
        }
    }

    /// Wraps a call accepted by a server connection.
    pub(crate) fn accept(
        connection: Connection,
        call: IncomingCall,
        shape: MethodShape,
        metrics: Arc<CallMetrics>,
    ) -> Self {
        Self::new(connection, call.context, call.channel, shape, metrics)
    }

    /// Sends one encoded message.
    pub async fn send(&mut self, payload: Vec<u8>) -> Result<(), CallError> {
        self.sender.send(payload).await
    }

    /// Closes the local sending direction. Idempotent.
    pub async fn close_send(&mut self) -> Result<(), CallError> {
        self.sender.close_send().await
    }

    /// Receives the next encoded message, or `None` at end of stream.
    pub async fn receive(&mut self) -> Result<Option<Vec<u8>>, CallError> {
        self.receiver.receive().await
    }

    /// The call's context.
    pub fn context(&self) -> &CallContext {
        &self.sender.shared.context
    }

    /// Current half-close state.
    pub fn state(&self) -> StreamState {
        self.sender.shared.state()
    }

    /// Call shape.
    pub fn shape(&self) -> MethodShape {
        self.sender.shared.shape
    }

    /// Which side of the call this session is.
    pub fn role(&self) -> Role {
        self.sender.shared.role
    }

    /// Wire format of the connection.
    pub fn codec(&self) -> Codec {
        self.sender.shared.connection.codec()
    }

    /// Splits into independently usable halves.
    pub fn split(self) -> (SessionSender, SessionReceiver) {
        (self.sender, self.receiver)
    }
}

impl fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSession")
            .field("call_id", &self.context().id())
            .field("method", &self.context().method())
            .field("role", &self.role())
            .field("shape", &self.shape())
            .field("state", &self.state())
            .finish()
    }
}

impl Shared {
    fn state(&self) -> StreamState {
        StreamState::from_flags(
            self.send_closed.load(Ordering::Acquire),
            self.recv_closed.load(Ordering::Acquire),
            self.context.is_finished(),
        )
    }

    /// Error to report for an operation on a call that already ended.
    fn ended(&self) -> Option<CallError> {
        match self.context.check() {
            Ok(()) if self.context.is_finished() => Some(CallError::StreamClosed),
            Ok(()) => None,
            Err(status) => Some(CallError::Status(status)),
        }
    }

    /// Error to report when the send window closed under a waiting sender.
    fn window_closed(&self) -> CallError {
        if let Some(error) = self.ended() {
            return error;
        }
        if self.connection.is_closed() {
            CallError::Status(Status::unavailable("connection closed"))
        } else {
            // The peer already sent its final status.
            CallError::StreamClosed
        }
    }
}

impl SessionSender {
    /// Sends one encoded message.
    ///
    /// Waits while the peer holds a full window of unread messages, and while
    /// the connection's outbound queue is full.
    ///
    /// # Errors
    ///
    /// - [`CallError::StreamClosed`] after [`close_send`](Self::close_send),
    ///   once the call completed, or once the server sent its final status
    /// - [`CallError::SendLimitExceeded`] past the shape's message count
    /// - [`CallError::Status`] if the call was cancelled, its deadline passed,
    ///   or the connection failed
    #[cfg_attr(
        feature = "observability",
        instrument(skip(self, payload), fields(call_id = %self.shared.context.id(), sequence = self.sent, size = payload.len()))
    )]
    pub async fn send(&mut self, payload: Vec<u8>) -> Result<(), CallError> {
        if self.shared.send_closed.load(Ordering::Acquire) {
            return Err(CallError::StreamClosed);
        }
        if let Some(error) = self.shared.ended() {
            return Err(error);
        }
        if let Some(limit) = self.limit {
            if self.sent >= limit {
                return Err(CallError::SendLimitExceeded {
                    shape: self.shared.shape,
                    limit,
                });
            }
        }

        tokio::select! {
            biased;
            status = self.shared.context.cancelled() => return Err(CallError::Status(status)),
            reserved = self.window.reserve() => {
                if reserved.is_err() {
                    return Err(self.shared.window_closed());
                }
            }
        }

        let call_id = self.shared.context.id();
        let frame = FrameKind::Message {
            sequence: self.sent,
            payload,
        };
        tokio::select! {
            biased;
            status = self.shared.context.cancelled() => return Err(CallError::Status(status)),
            result = self.shared.connection.send_frame(call_id, &frame) => result?,
        }

        self.sent += 1;
        self.shared.metrics.record_message_sent();
        Ok(())
    }

    /// Closes the sending direction.
    ///
    /// A client tells the server it will send no more messages; a server's
    /// direction ends with the call's final status, which the dispatcher sends.
    /// The second and later calls do nothing and always succeed.
    pub async fn close_send(&mut self) -> Result<(), CallError> {
        if self.shared.send_closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if self.shared.role == Role::Client && !self.shared.context.is_finished() {
            self.shared
                .connection
                .send_frame(self.shared.context.id(), &FrameKind::HalfClose)
                .await?;
        }
        Ok(())
    }

    /// Messages sent so far.
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// The call's context.
    pub fn context(&self) -> &CallContext {
        &self.shared.context
    }

    /// Current half-close state.
    pub fn state(&self) -> StreamState {
        self.shared.state()
    }

    /// Wire format of the connection.
    pub fn codec(&self) -> Codec {
        self.shared.connection.codec()
    }
}

impl SessionReceiver {
    /// Receives the next encoded message.
    ///
    /// Returns `Ok(None)` once the peer has closed its direction normally.
    /// Later calls keep returning `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`CallError::Status`] with the terminal status if the call was
    /// cancelled, timed out, failed on the peer, or lost its connection.
    #[cfg_attr(
        feature = "observability",
        instrument(skip(self), fields(call_id = %self.shared.context.id(), sequence = self.expected))
    )]
    pub async fn receive(&mut self) -> Result<Option<Vec<u8>>, CallError> {
        loop {
            if self.shared.recv_closed.load(Ordering::Acquire) {
                return match self.shared.context.status() {
                    Some(status) if !status.is_ok() => Err(CallError::Status(status)),
                    _ => Ok(None),
                };
            }

            if self.owed > 0 {
                self.return_credit().await;
            }

            let frame = tokio::select! {
                biased;
                status = self.shared.context.cancelled() => {
                    self.close_receive();
                    return Err(CallError::Status(status));
                }
                frame = self.inbound.recv() => frame,
            };

            match frame {
                Some(FrameKind::Message { sequence, payload }) => {
                    if sequence != self.expected {
                        self.close_receive();
                        let status = self.shared.context.finish(Status::internal(format!(
                            "message sequence gap: expected {}, got {}",
                            self.expected, sequence
                        )));
                        return Err(CallError::Status(status));
                    }
                    self.expected += 1;
                    self.shared.metrics.record_message_received();
                    if let Some(credit) = self.window.consume() {
                        self.owed += credit;
                        self.try_return_credit();
                    }
                    return Ok(Some(payload));
                }
                Some(FrameKind::HalfClose) if self.shared.role == Role::Server => {
                    self.close_receive();
                    return Ok(None);
                }
                Some(FrameKind::Status(status)) if self.shared.role == Role::Client => {
                    // The server's status also ends the client's direction.
                    self.close_receive();
                    self.shared.send_closed.store(true, Ordering::Release);
                    let status = self.shared.context.finish(status);
                    return if status.is_ok() {
                        Ok(None)
                    } else {
                        Err(CallError::Status(status))
                    };
                }
                Some(other) => {
                    warn!(call_id = %self.shared.context.id(), kind = other.name(), "Unexpected frame ignored");
                }
                None => {
                    self.close_receive();
                    let status = self
                        .shared
                        .context
                        .finish(Status::unavailable("connection lost"));
                    return if status.is_ok() {
                        Ok(None)
                    } else {
                        Err(CallError::Status(status))
                    };
                }
            }
        }
    }

    /// Messages received so far.
    pub fn received(&self) -> u64 {
        self.expected
    }

    /// The call's context.
    pub fn context(&self) -> &CallContext {
        &self.shared.context
    }

    /// Current half-close state.
    pub fn state(&self) -> StreamState {
        self.shared.state()
    }

    /// Wire format of the connection.
    pub fn codec(&self) -> Codec {
        self.shared.connection.codec()
    }

    fn close_receive(&self) {
        self.shared.recv_closed.store(true, Ordering::Release);
    }

    fn try_return_credit(&mut self) {
        let update = FrameKind::WindowUpdate { credit: self.owed };
        if self.shared.connection.try_send_frame(self.shared.context.id(), &update) {
            self.owed = 0;
        }
    }

    /// Hands back credit that could not be queued earlier. Owed credit is
    /// kept if this future is dropped part way.
    async fn return_credit(&mut self) {
        let update = FrameKind::WindowUpdate { credit: self.owed };
        let call_id = self.shared.context.id();
        if let Err(error) = self.shared.connection.send_frame(call_id, &update).await {
            trace!(%call_id, %error, "Window update not sent");
        }
        self.owed = 0;
    }
}
