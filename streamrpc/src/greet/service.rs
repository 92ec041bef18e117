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
use crate::greet::messages::*;
use crate::server::{Service, ServiceError};
use crate::session::{MessageSink, MessageStream};
use std::time::Duration;
use tracing::{debug, info};

/// Pacing of the slow greeting methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GreetSettings {
    /// Responses sent by `GreetManyTimes`.
    pub stream_count: u32,
    /// Pause between `GreetManyTimes` responses.
    pub stream_interval: Duration,
    /// Units of work done by `GreetWithDeadline` before it answers.
    pub deadline_steps: u32,
    /// Length of each `GreetWithDeadline` unit of work.
    pub deadline_step: Duration,
}

impl Default for GreetSettings {
    fn default() -> Self {
        Self {
            stream_count: 10,
            stream_interval: Duration::from_secs(1),
            deadline_steps: 3,
            deadline_step: Duration::from_secs(1),
        }
    }
}

impl GreetSettings {
    /// Same counts with every pause scaled to `interval`. Handy in tests.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.stream_interval = interval;
        self.deadline_step = interval;
        self
    }
}

/// Server side of `greet.GreetService`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GreetService {
    settings: GreetSettings,
}

impl GreetService {
    /// Creates the service with custom pacing.
    pub fn new(settings: GreetSettings) -> Self {
        Self { settings }
    }

    /// The service's pacing.
    pub fn settings(&self) -> GreetSettings {
        self.settings
    }

    /// Registers every method handler.
    pub fn into_service(self) -> Result<Service, ServiceError> {
        let settings = self.settings;
        Service::builder(GREET_SERVICE)
            .unary(&GREET, greet)
            .server_streaming(&GREET_MANY_TIMES, move |ctx, request, sink| {
                greet_many_times(settings, ctx, request, sink)
            })
            .client_streaming(&LONG_GREET, long_greet)
            .bidi_streaming(&GREET_EVERYONE, greet_everyone)
            .unary(&GREET_WITH_DEADLINE, move |ctx, request| {
                greet_with_deadline(settings, ctx, request)
            })
            .build()
    }
}

async fn greet(ctx: CallContext, request: GreetRequest) -> Result<GreetResponse, Status> {
    info!(call_id = %ctx.id(), greeting = ?request.greeting, metadata = ?ctx.metadata(), "Greet invoked");
    Ok(GreetResponse::from(format!(
        "Hello {}",
        request.greeting.first_name
    )))
}

async fn greet_many_times(
    settings: GreetSettings,
    ctx: CallContext,
    request: GreetManyTimesRequest,
    mut sink: MessageSink<GreetManyTimesResponse>,
) -> Result<(), Status> {
    info!(call_id = %ctx.id(), greeting = ?request.greeting, "GreetManyTimes invoked");
    let first_name = &request.greeting.first_name;

    for i in 0..settings.stream_count {
        if i > 0 {
            tokio::select! {
                status = ctx.cancelled() => {
                    info!(call_id = %ctx.id(), sent = i, "GreetManyTimes stopped early");
                    return Err(status);
                }
                _ = tokio::time::sleep(settings.stream_interval) => {}
            }
        }
        let response = GreetManyTimesResponse::from(format!("Hello {} number {}", first_name, i));
        sink.send(&response).await?;
    }

    debug!(call_id = %ctx.id(), "All the messages have been streamed");
    Ok(())
}

async fn long_greet(
    ctx: CallContext,
    mut requests: MessageStream<LongGreetRequest>,
) -> Result<LongGreetResponse, Status> {
    info!(call_id = %ctx.id(), "LongGreet invoked");
    let mut result = String::new();
    while let Some(request) = requests.message().await? {
        result.push_str(&format!("Hello {}! ", request.greeting.first_name));
    }
    Ok(LongGreetResponse::from(result))
}

async fn greet_everyone(
    ctx: CallContext,
    mut requests: MessageStream<GreetEveryoneRequest>,
    mut responses: MessageSink<GreetEveryoneResponse>,
) -> Result<(), Status> {
    info!(call_id = %ctx.id(), "GreetEveryone invoked");
    while let Some(request) = requests.message().await? {
        let response =
            GreetEveryoneResponse::from(format!("Hello {}! ", request.greeting.first_name));
        responses.send(&response).await?;
    }
    Ok(())
}

async fn greet_with_deadline(
    settings: GreetSettings,
    ctx: CallContext,
    request: GreetWithDeadlineRequest,
) -> Result<GreetWithDeadlineResponse, Status> {
    info!(call_id = %ctx.id(), greeting = ?request.greeting, deadline = ?ctx.time_remaining(), "GreetWithDeadline invoked");

    for _ in 0..settings.deadline_steps {
        if let Err(status) = ctx.check() {
            info!(call_id = %ctx.id(), code = %status.code(), "GreetWithDeadline abandoned");
            return Err(status);
        }
        tokio::select! {
            status = ctx.cancelled() => {
                info!(call_id = %ctx.id(), code = %status.code(), "GreetWithDeadline abandoned");
                return Err(status);
            }
            _ = tokio::time::sleep(settings.deadline_step) => {}
        }
    }

    Ok(GreetWithDeadlineResponse::from(format!(
        "Hello {}",
        request.greeting.first_name
    )))
}
