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

use crate::call::Status;
use crate::client::{CallOptions, Client};
use crate::greet::messages::*;
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use std::time::Duration;

/// Typed client for `greet.GreetService`.
#[derive(Debug, Clone)]
pub struct GreetClient {
    client: Client,
}

impl GreetClient {
    /// Wraps a connected [`Client`].
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Calls `Greet`.
    pub async fn greet(&self, greeting: Greeting, options: CallOptions) -> Result<String, Status> {
        let response: GreetResponse = self
            .client
            .unary(&GREET, &GreetRequest::from(greeting), options)
            .await?;
        Ok(response.result)
    }

    /// Calls `GreetManyTimes` and returns the greetings as they arrive.
    pub async fn greet_many_times(
        &self,
        greeting: Greeting,
        options: CallOptions,
    ) -> Result<BoxStream<'static, Result<String, Status>>, Status> {
        let responses = self
            .client
            .server_streaming::<_, GreetManyTimesResponse>(
                &GREET_MANY_TIMES,
                &GreetManyTimesRequest::from(greeting),
                options,
            )
            .await?;
        Ok(responses
            .into_stream()
            .map(|response| response.map(|r| r.result).map_err(Status::from))
            .boxed())
    }

    /// Calls `LongGreet` with every greeting from `greetings`.
    pub async fn long_greet<S>(&self, greetings: S, options: CallOptions) -> Result<String, Status>
    where
        S: Stream<Item = Greeting>,
    {
        let requests = greetings.map(LongGreetRequest::from);
        let response: LongGreetResponse = self
            .client
            .client_streaming(&LONG_GREET, requests, options)
            .await?;
        Ok(response.result)
    }

    /// Calls `GreetEveryone`, passing each reply to `on_reply`.
    pub async fn greet_everyone<S, F>(
        &self,
        greetings: S,
        options: CallOptions,
        mut on_reply: F,
    ) -> Result<(), Status>
    where
        S: Stream<Item = Greeting> + Send + 'static,
        F: FnMut(String),
    {
        let requests = greetings.map(GreetEveryoneRequest::from);
        self.client
            .bidi_streaming(
                &GREET_EVERYONE,
                requests,
                options,
                |response: GreetEveryoneResponse| on_reply(response.result),
            )
            .await
    }

    /// Calls `GreetWithDeadline` with the given timeout.
    pub async fn greet_with_deadline(
        &self,
        greeting: Greeting,
        timeout: Duration,
    ) -> Result<String, Status> {
        let response: GreetWithDeadlineResponse = self
            .client
            .unary(
                &GREET_WITH_DEADLINE,
                &GreetWithDeadlineRequest::from(greeting),
                CallOptions::new().with_timeout(timeout),
            )
            .await?;
        Ok(response.result)
    }
}

/// Yields `items` one at a time with `interval` between them.
pub fn paced<T>(items: Vec<T>, interval: Duration) -> impl Stream<Item = T> + Send + 'static
where
    T: Send + 'static,
{
    futures_util::stream::unfold((items.into_iter(), true), move |(mut items, first)| async move {
        let item = items.next()?;
        if !first {
            tokio::time::sleep(interval).await;
        }
        Some((item, (items, false)))
    })
}
