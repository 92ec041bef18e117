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

//! Integration tests for deadlines and cancellation.
//!
//! These tests verify that:
//! - A call that outlives its deadline ends with `DEADLINE_EXCEEDED` for the
//!   caller without waiting for the handler
//! - Cancelling or abandoning a call stops the server-side handler
//! - A call whose deadline has already passed never reaches the server

use futures_util::StreamExt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use streamrpc::call::Code;
use streamrpc::connection::ConnectionConfig;
use streamrpc::greet::{
    GREET_WITH_DEADLINE, GreetClient, GreetService, GreetSettings, GreetWithDeadlineRequest,
    Greeting,
};
use streamrpc::serialization::Serializer;
use streamrpc::transport::MemoryTransport;
use streamrpc::{CallMetrics, CallOptions, Client, Server, ServerConfig};

fn greet_server(step: Duration) -> Server {
    let settings = GreetSettings::default().with_interval(step);
    Server::new(ServerConfig::new())
        .add_service(GreetService::new(settings).into_service().unwrap())
        .unwrap()
}

fn connect(server: &Server) -> GreetClient {
    let (client_side, server_side) = MemoryTransport::pair_default();
    server.serve_connection(server_side);
    GreetClient::new(Client::new(client_side, ConnectionConfig::default()))
}

/// Waits up to two seconds for the server to finish a call with `code`.
async fn wait_for_finished(metrics: &Arc<CallMetrics>, code: Code) {
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while metrics.calls_finished_with(code) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "server never finished a call with {:?}", code);
}

#[tokio::test]
async fn test_deadline_exceeded_before_handler_completes() {
    // Three steps of 300ms against a 100ms deadline.
    let server = greet_server(Duration::from_millis(300));
    let client = connect(&server);

    let started = Instant::now();
    let status = client
        .greet_with_deadline(Greeting::new("Pavan", "Tikkani"), Duration::from_millis(100))
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert_eq!(status.code(), Code::DeadlineExceeded);
    assert!(status.is_deadline_exceeded());
    assert!(elapsed >= Duration::from_millis(100));
    assert!(elapsed < Duration::from_millis(600), "took {:?}", elapsed);

    // The server ends the call through its own deadline or the client's
    // cancel frame, whichever lands first. It never completes normally.
    let metrics = server.metrics();
    tokio::time::timeout(Duration::from_secs(2), async {
        while metrics.calls_finished() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(metrics.calls_finished_with(Code::Ok), 0);
}

#[tokio::test]
async fn test_generous_deadline_succeeds() {
    let server = greet_server(Duration::from_millis(10));
    let client = connect(&server);

    let result = client
        .greet_with_deadline(Greeting::new("Pavan", "Tikkani"), Duration::from_secs(5))
        .await
        .unwrap();
    assert_eq!(result, "Hello Pavan");
}

#[tokio::test]
async fn test_expired_deadline_never_reaches_server() {
    let server = greet_server(Duration::from_millis(10));
    let client = connect(&server);

    let status = client
        .greet(
            Greeting::first("Roy"),
            CallOptions::new().with_timeout(Duration::ZERO),
        )
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::DeadlineExceeded);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(server.metrics().calls_started(), 0);
}

#[tokio::test]
async fn test_explicit_cancel_stops_handler() {
    let server = greet_server(Duration::from_millis(200));
    let (client_side, server_side) = MemoryTransport::pair_default();
    server.serve_connection(server_side);
    let client = Client::new(client_side, ConnectionConfig::default());

    let mut session = client
        .open(&GREET_WITH_DEADLINE, CallOptions::new())
        .await
        .unwrap();
    let request = GreetWithDeadlineRequest::from(Greeting::first("Jason"));
    let payload = session.codec().serialize(&request).unwrap();
    session.send(payload).await.unwrap();
    session.close_send().await.unwrap();

    let status = session.context().cancel();
    assert!(status.is_cancelled());

    let error = session.receive().await.unwrap_err();
    assert_eq!(error.status().map(|s| s.code()), Some(Code::Cancelled));

    wait_for_finished(&server.metrics(), Code::Cancelled).await;
    assert_eq!(server.metrics().calls_finished_with(Code::Ok), 0);
}

#[tokio::test]
async fn test_dropping_response_stream_cancels_server() {
    let server = greet_server(Duration::from_millis(50));
    let client = connect(&server);

    let mut greetings = client
        .greet_many_times(Greeting::first("Logan"), CallOptions::new())
        .await
        .unwrap();
    assert_eq!(
        greetings.next().await.unwrap().unwrap(),
        "Hello Logan number 0"
    );
    drop(greetings);

    wait_for_finished(&server.metrics(), Code::Cancelled).await;
    assert_eq!(server.metrics().active_calls(), 0);
}

#[tokio::test]
async fn test_default_timeout_applies_to_calls_without_deadline() {
    let server = greet_server(Duration::from_millis(300));
    let (client_side, server_side) = MemoryTransport::pair_default();
    server.serve_connection(server_side);
    let client = GreetClient::new(
        Client::new(client_side, ConnectionConfig::default())
            .with_default_timeout(Some(Duration::from_millis(100))),
    );

    let failures = client
        .greet_many_times(Greeting::first("Paul"), CallOptions::new())
        .await
        .unwrap()
        .filter_map(|result| async move { result.err() });
    tokio::pin!(failures);
    let status = failures.next().await.unwrap();
    assert_eq!(status.code(), Code::DeadlineExceeded);
}
