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

use crate::call::{CallContext, CallError, CallId, CallIdGenerator, Code, Metadata, Status};
use crate::connection::window::{CALL_WINDOW, INBOUND_QUEUE_DEPTH, SendWindow};
use crate::connection::FrameKind;
use crate::serialization::framing::MAX_FRAME_SIZE;
use crate::serialization::{Codec, RawFrame, SerializationError, Serializer};
use crate::transport::{Transport, TransportId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// Default depth of the outbound frame queue.
pub const DEFAULT_OUTBOUND_QUEUE_DEPTH: usize = 256;

/// Which end of the connection this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Opens calls.
    Client,
    /// Accepts calls.
    Server,
}

/// Tunables for a single connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Wire format for frames and messages. Both peers must agree.
    pub codec: Codec,
    /// Largest accepted frame payload in bytes.
    pub max_frame_size: u32,
    /// Frames that may wait for the writer before senders are suspended.
    pub outbound_queue_depth: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            codec: Codec::default(),
            max_frame_size: MAX_FRAME_SIZE,
            outbound_queue_depth: DEFAULT_OUTBOUND_QUEUE_DEPTH,
        }
    }
}

impl ConnectionConfig {
    /// Sets the wire format.
    pub fn with_codec(mut self, codec: Codec) -> Self {
        self.codec = codec;
        self
    }

    /// Sets the frame size limit.
    pub fn with_max_frame_size(mut self, max_frame_size: u32) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    /// Sets the outbound queue depth.
    pub fn with_outbound_queue_depth(mut self, depth: usize) -> Self {
        self.outbound_queue_depth = depth;
        self
    }
}

/// What a session needs from the connection for one call.
#[derive(Debug)]
pub(crate) struct CallChannel {
    /// Messages, half-close and status frames in arrival order.
    pub(crate) inbound: mpsc::Receiver<FrameKind>,
    pub(crate) send_window: SendWindow,
}

/// A call that arrived on a server connection and has not been dispatched yet.
pub struct IncomingCall {
    /// Context created from the peer's open frame.
    pub context: CallContext,
    pub(crate) channel: CallChannel,
}

impl fmt::Debug for IncomingCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingCall")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Stream of calls opened by the peer of a server connection.
///
/// Ends when the connection closes.
#[derive(Debug)]
pub struct Incoming {
    calls: mpsc::UnboundedReceiver<IncomingCall>,
}

impl Incoming {
    /// Waits for the next call.
    pub async fn next(&mut self) -> Option<IncomingCall> {
        self.calls.recv().await
    }
}

struct Route {
    inbound: mpsc::Sender<FrameKind>,
    context: CallContext,
    send_window: SendWindow,
}

impl Route {
    fn new(context: CallContext) -> (Self, CallChannel) {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_DEPTH);
        let send_window = SendWindow::new(CALL_WINDOW);
        let route = Route {
            inbound: inbound_tx,
            context,
            send_window: send_window.clone(),
        };
        let channel = CallChannel {
            inbound: inbound_rx,
            send_window,
        };
        (route, channel)
    }
}

struct Shared {
    transport_id: TransportId,
    role: Role,
    codec: Codec,
    max_frame_size: u32,
    outbound: mpsc::Sender<RawFrame>,
    routes: Mutex<HashMap<CallId, Route>>,
    call_ids: CallIdGenerator,
    shutdown: watch::Sender<bool>,
}

/// One transport carrying many concurrent calls.
///
/// A connection owns two background tasks: a writer that serializes every
/// outbound frame onto the transport, and a reader that routes inbound frames
/// to the call they belong to. Senders only ever enqueue whole frames, so
/// frames of different calls never interleave on the wire. The outbound queue
/// is bounded; a full queue suspends senders until the writer catches up.
///
/// Cloning is cheap. The connection shuts down when the last clone is dropped,
/// when [`close`](Connection::close) is called, or when the transport fails.
#[derive(Clone)]
pub struct Connection {
    handle: Arc<Handle>,
}

struct Handle {
    shared: Arc<Shared>,
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.shared.shut_down("connection dropped");
    }
}

impl Connection {
    /// Starts a client connection over `transport`.
    pub fn client<T: Transport>(transport: T, config: ConnectionConfig) -> Self {
        let (connection, _) = Self::start(transport, Role::Client, config);
        connection
    }

    /// Starts a server connection over `transport`, returning the stream of
    /// calls the peer opens.
    pub fn server<T: Transport>(transport: T, config: ConnectionConfig) -> (Self, Incoming) {
        let (connection, calls) = Self::start(transport, Role::Server, config);
        let (_, placeholder) = mpsc::unbounded_channel();
        let incoming = Incoming {
            calls: calls.unwrap_or(placeholder),
        };
        (connection, incoming)
    }

    fn start<T: Transport>(
        transport: T,
        role: Role,
        config: ConnectionConfig,
    ) -> (Self, Option<mpsc::UnboundedReceiver<IncomingCall>>) {
        let transport_id = transport.metadata().id;
        let (reader, writer) = transport.split();
        let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_queue_depth.max(1));
        let (shutdown, _) = watch::channel(false);

        let shared = Arc::new(Shared {
            transport_id,
            role,
            codec: config.codec,
            max_frame_size: config.max_frame_size,
            outbound: outbound_tx,
            routes: Mutex::new(HashMap::new()),
            call_ids: CallIdGenerator::new(),
            shutdown,
        });

        let (incoming_tx, incoming_rx) = match role {
            Role::Server => {
                let (tx, rx) = mpsc::unbounded_channel();
                (Some(tx), Some(rx))
            }
            Role::Client => (None, None),
        };

        tokio::spawn(write_loop(Arc::clone(&shared), writer, outbound_rx));
        tokio::spawn(read_loop(Arc::clone(&shared), reader, incoming_tx));

        info!(transport_id = %transport_id, ?role, codec = %config.codec, "Connection started");

        let connection = Self {
            handle: Arc::new(Handle { shared }),
        };
        (connection, incoming_rx)
    }

    /// Id of the underlying transport.
    pub fn transport_id(&self) -> TransportId {
        self.shared().transport_id
    }

    /// Which end this is.
    pub fn role(&self) -> Role {
        self.shared().role
    }

    /// Wire format in use.
    pub fn codec(&self) -> Codec {
        self.shared().codec
    }

    /// Number of calls currently routed on this connection.
    pub fn active_calls(&self) -> usize {
        self.shared().routes.lock().len()
    }

    /// `true` once the connection has shut down.
    pub fn is_closed(&self) -> bool {
        *self.shared().shutdown.borrow()
    }

    /// Waits until the connection has shut down.
    pub async fn closed(&self) {
        let mut rx = self.shared().shutdown.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Shuts the connection down. Calls still in flight end with `UNAVAILABLE`.
    pub fn close(&self) {
        self.shared().shut_down("connection closed locally");
    }

    /// Opens a new call: registers its route, sends the open frame and
    /// starts the task that reports cancellation or deadline expiry to the peer.
    pub(crate) async fn open_call(
        &self,
        method: &str,
        deadline: Option<Instant>,
        metadata: Metadata,
    ) -> Result<(CallContext, CallChannel), Status> {
        let shared = self.shared();
        if self.is_closed() {
            return Err(Status::unavailable("connection closed"));
        }

        let timeout_ms = match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(Status::deadline_exceeded(
                        "deadline passed before the call was opened",
                    ));
                }
                Some(u64::try_from(remaining.as_millis()).unwrap_or(u64::MAX).max(1))
            }
            None => None,
        };

        let call_id = shared.call_ids.next();
        let context = CallContext::new(call_id, method, deadline, metadata.clone());
        let (route, channel) = Route::new(context.clone());
        shared.routes.lock().insert(call_id, route);

        let open = FrameKind::Open {
            method: method.to_string(),
            timeout_ms,
            metadata,
        };
        if let Err(error) = self.send_frame(call_id, &open).await {
            self.deregister(call_id);
            return Err(Status::from(error));
        }

        debug!(transport_id = %shared.transport_id, call_id = %call_id, method, ?timeout_ms, "Call opened");
        tokio::spawn(report_abandonment(Arc::clone(shared), context.clone()));

        Ok((context, channel))
    }

    /// Encodes `kind` and queues it for the writer, waiting if the queue is full.
    pub(crate) async fn send_frame(&self, call_id: CallId, kind: &FrameKind) -> Result<(), CallError> {
        let frame = self.shared().encode(call_id, kind)?;
        self.shared()
            .outbound
            .send(frame)
            .await
            .map_err(|_| CallError::Status(Status::unavailable("connection closed")))
    }

    /// Queues `kind` without waiting. Returns `false` if it could not be queued.
    pub(crate) fn try_send_frame(&self, call_id: CallId, kind: &FrameKind) -> bool {
        self.shared().try_send(call_id, kind)
    }

    /// Stops routing frames for `call_id` and wakes any sender waiting for credit.
    pub(crate) fn deregister(&self, call_id: CallId) {
        let removed = self.shared().routes.lock().remove(&call_id);
        if let Some(route) = removed {
            route.send_window.close();
            trace!(transport_id = %self.shared().transport_id, call_id = %call_id, "Call deregistered");
        }
    }

    fn shared(&self) -> &Arc<Shared> {
        &self.handle.shared
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("transport_id", &self.shared().transport_id)
            .field("role", &self.shared().role)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Shared {
    fn encode(&self, call_id: CallId, kind: &FrameKind) -> Result<RawFrame, CallError> {
        let payload = self.codec.serialize(kind)?;
        if payload.len() > self.max_frame_size as usize {
            return Err(CallError::Encode(SerializationError::TooLarge {
                what: kind.name(),
                size: payload.len(),
                limit: self.max_frame_size as usize,
            }));
        }
        Ok(RawFrame::new(call_id, payload))
    }

    fn try_send(&self, call_id: CallId, kind: &FrameKind) -> bool {
        match self.encode(call_id, kind) {
            Ok(frame) => self.outbound.try_send(frame).is_ok(),
            Err(_) => false,
        }
    }

    fn shut_down(&self, reason: &str) {
        if self.shutdown.send_replace(true) {
            return;
        }

        let routes: Vec<Route> = self.routes.lock().drain().map(|(_, route)| route).collect();
        info!(transport_id = %self.transport_id, reason, active_calls = routes.len(), "Connection shutting down");
        for route in &routes {
            route.send_window.close();
        }

        // Client sessions drain what was already routed and then observe the
        // closed queue; server handlers may never read again, so wake them here.
        if self.role == Role::Server {
            for route in routes {
                route
                    .context
                    .finish(Status::unavailable(format!("connection lost: {}", reason)));
            }
        }
    }

    fn route(&self, call_id: CallId, kind: FrameKind, incoming: Option<&mpsc::UnboundedSender<IncomingCall>>) {
        match kind {
            FrameKind::Open {
                method,
                timeout_ms,
                metadata,
            } => {
                let Some(incoming) = incoming else {
                    warn!(transport_id = %self.transport_id, call_id = %call_id, "Ignoring open frame on client connection");
                    return;
                };
                self.accept_call(call_id, method, timeout_ms, metadata, incoming);
            }
            FrameKind::Cancel => {
                if let Some(context) = self.context_of(call_id) {
                    debug!(transport_id = %self.transport_id, call_id = %call_id, "Call cancelled by peer");
                    context.finish(Status::cancelled("call cancelled by peer"));
                }
            }
            FrameKind::WindowUpdate { credit } => {
                if let Some(route) = self.routes.lock().get(&call_id) {
                    route.send_window.grant(credit);
                }
            }
            other => self.enqueue(call_id, other),
        }
    }

    /// Queues a message, half-close or status behind everything the call
    /// has not read yet.
    fn enqueue(&self, call_id: CallId, kind: FrameKind) {
        let overrun = {
            let routes = self.routes.lock();
            let Some(route) = routes.get(&call_id) else {
                trace!(transport_id = %self.transport_id, call_id = %call_id, kind = kind.name(), "Frame for unknown call dropped");
                return;
            };
            if self.role == Role::Client && matches!(kind, FrameKind::Status(_)) {
                // The server stopped reading; nothing this side sends matters now.
                route.send_window.close();
            }
            match route.inbound.try_send(kind) {
                Ok(()) => None,
                Err(TrySendError::Closed(_)) => {
                    trace!(transport_id = %self.transport_id, call_id = %call_id, "Session gone, frame dropped");
                    None
                }
                Err(TrySendError::Full(_)) => Some(route.context.clone()),
            }
        };

        if let Some(context) = overrun {
            warn!(transport_id = %self.transport_id, call_id = %call_id, "Peer overran the call window");
            context.finish(Status::internal("peer exceeded the flow control window"));
            if self.role == Role::Client {
                self.try_send(call_id, &FrameKind::Cancel);
            }
        }
    }

    fn accept_call(
        &self,
        call_id: CallId,
        method: String,
        timeout_ms: Option<u64>,
        metadata: Metadata,
        incoming: &mpsc::UnboundedSender<IncomingCall>,
    ) {
        let deadline = timeout_ms.map(|ms| Instant::now() + Duration::from_millis(ms));
        let context = CallContext::new(call_id, method, deadline, metadata);
        let (route, channel) = Route::new(context.clone());

        {
            let mut routes = self.routes.lock();
            if routes.contains_key(&call_id) {
                warn!(transport_id = %self.transport_id, call_id = %call_id, "Duplicate open frame ignored");
                return;
            }
            routes.insert(call_id, route);
        }

        let call = IncomingCall { context, channel };
        if incoming.send(call).is_err() {
            self.routes.lock().remove(&call_id);
            self.try_send(
                call_id,
                &FrameKind::Status(Status::unavailable("server is not accepting calls")),
            );
        }
    }

    fn context_of(&self, call_id: CallId) -> Option<CallContext> {
        self.routes
            .lock()
            .get(&call_id)
            .map(|route| route.context.clone())
    }
}

/// Tells the server when a client call ends early so it can stop work.
async fn report_abandonment(shared: Arc<Shared>, context: CallContext) {
    let mut closed = shared.shutdown.subscribe();
    let status = tokio::select! {
        status = context.done() => status,
        _ = closed.wait_for(|closed| *closed) => return,
    };
    if matches!(status.code(), Code::Cancelled | Code::DeadlineExceeded) {
        debug!(transport_id = %shared.transport_id, call_id = %context.id(), code = %status.code(), "Notifying peer of abandoned call");
        if let Ok(frame) = shared.encode(context.id(), &FrameKind::Cancel) {
            let _ = shared.outbound.send(frame).await;
        }
    }
}

async fn write_loop<W>(shared: Arc<Shared>, mut writer: W, mut outbound: mpsc::Receiver<RawFrame>)
where
    W: AsyncWrite + Unpin,
{
    let mut shutdown = shared.shutdown.subscribe();
    debug!(transport_id = %shared.transport_id, "Writer started");

    loop {
        let frame = tokio::select! {
            frame = outbound.recv() => match frame {
                Some(frame) => frame,
                None => break,
            },
            _ = shutdown.wait_for(|closed| *closed) => break,
        };

        if let Err(e) = write_batch(&shared, &mut writer, frame, &mut outbound).await {
            warn!(transport_id = %shared.transport_id, error = %e, "Transport write failed");
            shared.shut_down("write failed");
            return;
        }
    }

    // Flush whatever was queued before shutdown, such as final statuses.
    while let Ok(frame) = outbound.try_recv() {
        if frame.write_to(&mut writer, shared.max_frame_size).await.is_err() {
            break;
        }
    }
    let _ = writer.flush().await;
    let _ = writer.shutdown().await;
    debug!(transport_id = %shared.transport_id, "Writer stopped");
}

/// Writes `first` plus everything already queued, then flushes once.
async fn write_batch<W>(
    shared: &Shared,
    writer: &mut W,
    first: RawFrame,
    outbound: &mut mpsc::Receiver<RawFrame>,
) -> Result<(), crate::serialization::FramingError>
where
    W: AsyncWrite + Unpin,
{
    first.write_to(writer, shared.max_frame_size).await?;
    while let Ok(frame) = outbound.try_recv() {
        frame.write_to(writer, shared.max_frame_size).await?;
    }
    writer.flush().await?;
    Ok(())
}

async fn read_loop<R>(
    shared: Arc<Shared>,
    mut reader: R,
    incoming: Option<mpsc::UnboundedSender<IncomingCall>>,
) where
    R: AsyncRead + Unpin,
{
    let mut shutdown = shared.shutdown.subscribe();
    debug!(transport_id = %shared.transport_id, "Reader started");

    let reason = loop {
        let next = tokio::select! {
            next = RawFrame::read_from(&mut reader, shared.max_frame_size) => next,
            _ = shutdown.wait_for(|closed| *closed) => break "connection closed locally".to_string(),
        };

        match next {
            Ok(Some(frame)) => match shared.codec.deserialize::<FrameKind>(&frame.payload) {
                Ok(kind) => {
                    trace!(transport_id = %shared.transport_id, call_id = %frame.call_id, kind = kind.name(), "Frame received");
                    shared.route(frame.call_id, kind, incoming.as_ref());
                }
                Err(e) => {
                    warn!(transport_id = %shared.transport_id, call_id = %frame.call_id, error = %e, "Undecodable frame");
                    break "undecodable frame".to_string();
                }
            },
            Ok(None) => break "closed by peer".to_string(),
            Err(e) => {
                warn!(transport_id = %shared.transport_id, error = %e, "Transport read failed");
                break e.to_string();
            }
        }
    };

    shared.shut_down(&reason);
    debug!(transport_id = %shared.transport_id, "Reader stopped");
}
