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

use crate::call::{CallContext, Status};
use crate::connection::{Connection, FrameKind, Incoming, IncomingCall};
use crate::observability::{CallMetrics, log_status};
use crate::server::service::Router;
use crate::session::StreamSession;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, error, warn};

#[cfg(feature = "observability")]
use tracing::instrument;

/// Runs each incoming call's handler in its own task and reports the
/// outcome to the caller as the call's final status.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    router: Arc<Router>,
    metrics: Arc<CallMetrics>,
    max_concurrent_calls: Option<usize>,
}

impl Dispatcher {
    pub(crate) fn new(
        router: Arc<Router>,
        metrics: Arc<CallMetrics>,
        max_concurrent_calls: Option<usize>,
    ) -> Self {
        Self {
            router,
            metrics,
            max_concurrent_calls,
        }
    }

    /// Dispatches every call opened on `connection` until it closes.
    pub(crate) async fn run(&self, connection: Connection, mut incoming: Incoming) {
        let limit = self
            .max_concurrent_calls
            .map(|limit| Arc::new(Semaphore::new(limit)));

        while let Some(call) = incoming.next().await {
            let permit = match &limit {
                Some(limit) => match Arc::clone(limit).try_acquire_owned() {
                    Ok(permit) => Some(permit),
                    Err(_) => {
                        warn!(
                            transport_id = %connection.transport_id(),
                            method = call.context.method(),
                            "Concurrent call limit reached, rejecting call"
                        );
                        self.reject(&connection, call, Status::unavailable("too many concurrent calls"))
                            .await;
                        continue;
                    }
                },
                None => None,
            };

            let dispatcher = self.clone();
            let connection = connection.clone();
            tokio::spawn(async move {
                dispatcher.dispatch(connection, call, permit).await;
            });
        }

        debug!(transport_id = %connection.transport_id(), "Connection has no more calls");
    }

    /// Runs one call to completion.
    #[cfg_attr(
        feature = "observability",
        instrument(skip_all, fields(call_id = %call.context.id(), method = call.context.method()))
    )]
    pub(crate) async fn dispatch(
        &self,
        connection: Connection,
        call: IncomingCall,
        _permit: Option<OwnedSemaphorePermit>,
    ) {
        let context = call.context.clone();
        let method = context.method().to_string();
        self.metrics.record_call_started(&method);

        let Some(handler) = self.router.route(&method) else {
            debug!(%method, "No handler for method");
            let status = context.finish(Status::internal(format!("method not found: {}", method)));
            self.complete(&connection, call.context, status).await;
            return;
        };

        let session =
            StreamSession::accept(connection.clone(), call, handler.shape(), Arc::clone(&self.metrics));
        let mut task = tokio::spawn(async move { handler.call(session).await });

        let outcome = tokio::select! {
            biased;
            joined = &mut task => match joined {
                Ok(Ok(())) => Status::ok(),
                Ok(Err(status)) => status,
                Err(e) if e.is_panic() => {
                    error!(%method, "Handler panicked");
                    Status::internal("handler panicked")
                }
                Err(_) => Status::internal("handler task aborted"),
            },
            // The handler keeps running until it notices; its sends now fail.
            status = context.cancelled() => status,
        };

        let status = context.finish(outcome);
        self.complete(&connection, context, status).await;
    }

    async fn reject(&self, connection: &Connection, call: IncomingCall, status: Status) {
        self.metrics.record_call_started(call.context.method());
        let status = call.context.finish(status);
        self.complete(connection, call.context, status).await;
    }

    async fn complete(
        &self,
        connection: &Connection,
        context: CallContext,
        status: Status,
    ) {
        let call_id = context.id();
        if let Err(e) = connection
            .send_frame(call_id, &FrameKind::Status(status.clone()))
            .await
        {
            debug!(call_id = %call_id, error = %e, "Final status not delivered");
        }
        connection.deregister(call_id);
        self.metrics.record_call_finished(context.method(), &status);
        log_status(context.method(), &status);
    }
}
