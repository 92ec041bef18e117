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

//! Call multiplexing over a single transport.
//!
//! # Architecture
//!
//! A [`Connection`] runs two independent tasks:
//!
//! - **Writer**: drains a bounded queue of frames and writes them to the
//!   transport one whole frame at a time
//! - **Reader**: reads frames from the transport and routes each to the
//!   queue of the call it belongs to
//!
//! Cancel frames are applied to the call's
//! [`CallContext`](crate::call::CallContext) as soon as they are read, so a
//! handler learns about cancellation even while it is not receiving. Window
//! updates go straight to the call's send credit. Messages, half-closes and
//! statuses are queued in arrival order, so a failed status is seen only
//! after every message the peer sent before it.
//!
//! Each call's inbound queue is bounded by the per-call credit window (see
//! [`CALL_WINDOW`]). A sender that has used up its credit is suspended until
//! the receiving application consumes messages.
//!
//! Frames for calls that are no longer registered are dropped.

#[allow(clippy::module_inception)]
mod connection;
mod frame;
mod window;

pub use connection::{
    Connection, ConnectionConfig, DEFAULT_OUTBOUND_QUEUE_DEPTH, Incoming, IncomingCall, Role,
};
pub use frame::FrameKind;
pub use window::CALL_WINDOW;

pub(crate) use connection::CallChannel;
pub(crate) use window::{ReceiveWindow, SendWindow};
