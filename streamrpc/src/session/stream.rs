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

use crate::call::{CallContext, CallError};
use crate::serialization::Serializer;
use crate::session::{SessionReceiver, SessionSender, StreamState};
use futures_util::Stream;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::marker::PhantomData;

/// Typed view of a [`SessionReceiver`].
///
/// Each message is decoded with the connection's codec.
pub struct MessageStream<T> {
    receiver: SessionReceiver,
    _marker: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> MessageStream<T> {
    pub(crate) fn new(receiver: SessionReceiver) -> Self {
        Self {
            receiver,
            _marker: PhantomData,
        }
    }

    /// Next message, or `None` once the peer has finished sending.
    pub async fn message(&mut self) -> Result<Option<T>, CallError> {
        match self.receiver.receive().await? {
            Some(bytes) => Ok(Some(self.receiver.codec().deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Converts into a [`Stream`] of messages. The stream ends after the
    /// first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<T, CallError>> + Send + 'static
    where
        T: Send + 'static,
    {
        futures_util::stream::unfold(Some(self), |state| async move {
            let mut stream = state?;
            match stream.message().await {
                Ok(Some(message)) => Some((Ok(message), Some(stream))),
                Ok(None) => None,
                Err(error) => Some((Err(error), None)),
            }
        })
    }

    /// The call's context.
    pub fn context(&self) -> &CallContext {
        self.receiver.context()
    }

    /// Messages received so far.
    pub fn received(&self) -> u64 {
        self.receiver.received()
    }
}

impl<T> fmt::Debug for MessageStream<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageStream")
            .field("call_id", &self.receiver.context().id())
            .field("received", &self.receiver.received())
            .finish()
    }
}

/// Typed view of a [`SessionSender`].
pub struct MessageSink<T> {
    sender: SessionSender,
    _marker: PhantomData<fn(&T)>,
}

impl<T: Serialize> MessageSink<T> {
    pub(crate) fn new(sender: SessionSender) -> Self {
        Self {
            sender,
            _marker: PhantomData,
        }
    }

    /// Encodes and sends one message.
    pub async fn send(&mut self, message: &T) -> Result<(), CallError> {
        let bytes = Serializer::serialize(&self.sender.codec(), message)?;
        self.sender.send(bytes).await
    }

    /// Closes the sending direction. Idempotent.
    pub async fn close(&mut self) -> Result<(), CallError> {
        self.sender.close_send().await
    }

    /// The call's context.
    pub fn context(&self) -> &CallContext {
        self.sender.context()
    }

    /// Current half-close state.
    pub fn state(&self) -> StreamState {
        self.sender.state()
    }

    /// Messages sent so far.
    pub fn sent(&self) -> u64 {
        self.sender.sent()
    }
}

impl<T> fmt::Debug for MessageSink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageSink")
            .field("call_id", &self.sender.context().id())
            .field("sent", &self.sender.sent())
            .finish()
    }
}
