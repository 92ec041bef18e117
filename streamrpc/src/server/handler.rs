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

//! Adapters from typed handler functions to a single erased call interface.

use crate::call::{CallContext, MethodShape, Status};
use crate::session::{MessageSink, MessageStream, StreamSession};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// A registered method implementation, independent of message types.
#[async_trait]
pub(crate) trait ErasedHandler: Send + Sync + 'static {
    /// Shape the handler was registered for.
    fn shape(&self) -> MethodShape;

    /// Runs the handler to completion over `session`.
    ///
    /// The returned status becomes the call's terminal status unless the call
    /// already ended some other way.
    async fn call(&self, session: StreamSession) -> Result<(), Status>;
}

pub(crate) struct UnaryHandler<F, Req, Resp, Fut> {
    f: F,
    _marker: PhantomData<fn(Req) -> (Resp, Fut)>,
}

pub(crate) struct ServerStreamingHandler<F, Req, Resp, Fut> {
    f: F,
    _marker: PhantomData<fn(Req) -> (Resp, Fut)>,
}

pub(crate) struct ClientStreamingHandler<F, Req, Resp, Fut> {
    f: F,
    _marker: PhantomData<fn(Req) -> (Resp, Fut)>,
}

pub(crate) struct BidiStreamingHandler<F, Req, Resp, Fut> {
    f: F,
    _marker: PhantomData<fn(Req) -> (Resp, Fut)>,
}

macro_rules! handler_constructor {
    ($($name:ident),*) => {
        $(
            impl<F, Req, Resp, Fut> $name<F, Req, Resp, Fut> {
                pub(crate) fn new(f: F) -> Self {
                    Self {
                        f,
                        _marker: PhantomData,
                    }
                }
            }
        )*
    };
}

handler_constructor!(
    UnaryHandler,
    ServerStreamingHandler,
    ClientStreamingHandler,
    BidiStreamingHandler
);

/// Erases a unary handler function.
pub(crate) fn unary<F, Req, Resp, Fut>(f: F) -> Arc<dyn ErasedHandler>
where
    F: Fn(CallContext, Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, Status>> + Send + 'static,
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + Sync + 'static,
{
    Arc::new(UnaryHandler::new(f))
}

/// Reads the single request of a unary or server-streaming call.
async fn single_request<Req: DeserializeOwned>(
    requests: &mut MessageStream<Req>,
) -> Result<Req, Status> {
    requests
        .message()
        .await?
        .ok_or_else(|| Status::internal("missing request message"))
}

#[async_trait]
impl<F, Req, Resp, Fut> ErasedHandler for UnaryHandler<F, Req, Resp, Fut>
where
    F: Fn(CallContext, Req) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, Status>> + Send + 'static,
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + Sync + 'static,
{
    fn shape(&self) -> MethodShape {
        MethodShape::Unary
    }

    async fn call(&self, session: StreamSession) -> Result<(), Status> {
        let context = session.context().clone();
        let (sender, receiver) = session.split();
        let mut requests = MessageStream::<Req>::new(receiver);
        let request = single_request(&mut requests).await?;

        let response = (self.f)(context, request).await?;
        MessageSink::<Resp>::new(sender).send(&response).await?;
        Ok(())
    }
}

#[async_trait]
impl<F, Req, Resp, Fut> ErasedHandler for ServerStreamingHandler<F, Req, Resp, Fut>
where
    F: Fn(CallContext, Req, MessageSink<Resp>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Status>> + Send + 'static,
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + Sync + 'static,
{
    fn shape(&self) -> MethodShape {
        MethodShape::ServerStream
    }

    async fn call(&self, session: StreamSession) -> Result<(), Status> {
        let context = session.context().clone();
        let (sender, receiver) = session.split();
        let mut requests = MessageStream::<Req>::new(receiver);
        let request = single_request(&mut requests).await?;

        (self.f)(context, request, MessageSink::new(sender)).await
    }
}

#[async_trait]
impl<F, Req, Resp, Fut> ErasedHandler for ClientStreamingHandler<F, Req, Resp, Fut>
where
    F: Fn(CallContext, MessageStream<Req>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Resp, Status>> + Send + 'static,
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + Sync + 'static,
{
    fn shape(&self) -> MethodShape {
        MethodShape::ClientStream
    }

    async fn call(&self, session: StreamSession) -> Result<(), Status> {
        let context = session.context().clone();
        let (sender, receiver) = session.split();

        let response = (self.f)(context, MessageStream::new(receiver)).await?;
        MessageSink::<Resp>::new(sender).send(&response).await?;
        Ok(())
    }
}

#[async_trait]
impl<F, Req, Resp, Fut> ErasedHandler for BidiStreamingHandler<F, Req, Resp, Fut>
where
    F: Fn(CallContext, MessageStream<Req>, MessageSink<Resp>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), Status>> + Send + 'static,
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + Sync + 'static,
{
    fn shape(&self) -> MethodShape {
        MethodShape::BidiStream
    }

    async fn call(&self, session: StreamSession) -> Result<(), Status> {
        let context = session.context().clone();
        let (sender, receiver) = session.split();

        (self.f)(context, MessageStream::new(receiver), MessageSink::new(sender)).await
    }
}
