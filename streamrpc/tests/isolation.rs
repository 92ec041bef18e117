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

//! Integration tests for per-call failure isolation.
//!
//! A failing, panicking or unroutable call must end with its own status while
//! other calls on the same connection carry on untouched.

use futures_util::StreamExt;
use std::time::Duration;
use streamrpc::call::{CallContext, Code, MethodDescriptor, MethodShape, ServiceDescriptor, Status};
use streamrpc::connection::{CALL_WINDOW, ConnectionConfig};
use streamrpc::transport::MemoryTransport;
use streamrpc::{CallOptions, Client, MessageSink, Server, ServerConfig, Service};

const PANIC: MethodDescriptor =
    MethodDescriptor::new("/test.Faulty/Panic", MethodShape::Unary, "String", "String");
const FAIL: MethodDescriptor =
    MethodDescriptor::new("/test.Faulty/Fail", MethodShape::Unary, "String", "String");
const SLOW: MethodDescriptor =
    MethodDescriptor::new("/test.Faulty/Slow", MethodShape::Unary, "String", "String");
const PARTIAL: MethodDescriptor = MethodDescriptor::new(
    "/test.Faulty/Partial",
    MethodShape::ServerStream,
    "u32",
    "u32",
);
const FAULTY: ServiceDescriptor =
    ServiceDescriptor::new("test.Faulty", &[PANIC, FAIL, SLOW, PARTIAL]);

const MISSING: MethodDescriptor =
    MethodDescriptor::new("/test.Missing/Nothing", MethodShape::Unary, "String", "String");

async fn explode(_ctx: CallContext, _request: String) -> Result<String, Status> {
    panic!("handler exploded");
}

async fn fail(_ctx: CallContext, request: String) -> Result<String, Status> {
    Err(Status::internal(format!("refusing {}", request)))
}

async fn slow(_ctx: CallContext, request: String) -> Result<String, Status> {
    tokio::time::sleep(Duration::from_millis(200)).await;
    Ok(request)
}

async fn partial(_ctx: CallContext, count: u32, mut sink: MessageSink<u32>) -> Result<(), Status> {
    for i in 0..count {
        sink.send(&i).await?;
    }
    Err(Status::internal("ran out of numbers"))
}

fn faulty_server(config: ServerConfig) -> Server {
    let service = Service::builder(FAULTY)
        .unary(&PANIC, explode)
        .unary(&FAIL, fail)
        .unary(&SLOW, slow)
        .server_streaming(&PARTIAL, partial)
        .build()
        .unwrap();
    Server::new(config).add_service(service).unwrap()
}

fn connect(server: &Server) -> Client {
    let (client_side, server_side) = MemoryTransport::pair_default();
    server.serve_connection(server_side);
    Client::new(client_side, ConnectionConfig::default())
}

#[tokio::test]
async fn test_panicking_handler_does_not_affect_other_calls() {
    let server = faulty_server(ServerConfig::new());
    let client = connect(&server);

    let slow_call = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .unary::<_, String>(&SLOW, &"survivor".to_string(), CallOptions::new())
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    let status = client
        .unary::<_, String>(&PANIC, &"boom".to_string(), CallOptions::new())
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Internal);
    assert_eq!(status.detail(), Some("handler panicked"));

    assert_eq!(slow_call.await.unwrap().unwrap(), "survivor");
    assert!(!client.connection().is_closed());
}

#[tokio::test]
async fn test_failing_handler_status_reaches_caller() {
    let server = faulty_server(ServerConfig::new());
    let client = connect(&server);

    let status = client
        .unary::<_, String>(&FAIL, &"this".to_string(), CallOptions::new())
        .await
        .unwrap_err();
    assert_eq!(status, Status::internal("refusing this"));

    let reply: String = client
        .unary(&SLOW, &"still here".to_string(), CallOptions::new())
        .await
        .unwrap();
    assert_eq!(reply, "still here");
    assert_eq!(server.metrics().calls_finished_with(Code::Internal), 1);
    assert_eq!(server.metrics().calls_finished_with(Code::Ok), 1);
}

#[tokio::test]
async fn test_stream_failure_after_partial_output() {
    let server = faulty_server(ServerConfig::new());
    let client = connect(&server);

    let results: Vec<_> = client
        .server_streaming::<u32, u32>(&PARTIAL, &3, CallOptions::new())
        .await
        .unwrap()
        .into_stream()
        .collect()
        .await;

    assert_eq!(results.len(), 4);
    for (i, result) in results.iter().take(3).enumerate() {
        assert_eq!(*result.as_ref().unwrap(), i as u32);
    }
    let error = results[3].as_ref().unwrap_err();
    assert_eq!(
        error.status(),
        Some(&Status::internal("ran out of numbers"))
    );
}

#[tokio::test]
async fn test_stream_failure_after_several_windows_of_output() {
    let server = faulty_server(ServerConfig::new());
    let client = connect(&server);

    let count = 4 * CALL_WINDOW;
    let mut responses = client
        .server_streaming::<u32, u32>(&PARTIAL, &count, CallOptions::new())
        .await
        .unwrap();

    for expected in 0..count {
        // A slow reader keeps the server waiting for credit.
        if expected % 50 == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(responses.message().await.unwrap(), Some(expected));
    }
    let error = responses.message().await.unwrap_err();
    assert_eq!(
        error.status(),
        Some(&Status::internal("ran out of numbers"))
    );
}

#[tokio::test]
async fn test_unknown_method_is_internal() {
    let server = faulty_server(ServerConfig::new());
    let client = connect(&server);

    let status = client
        .unary::<_, String>(&MISSING, &"anyone?".to_string(), CallOptions::new())
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Internal);
    assert_eq!(status.detail(), Some("method not found: /test.Missing/Nothing"));

    let reply: String = client
        .unary(&SLOW, &"fine".to_string(), CallOptions::new())
        .await
        .unwrap();
    assert_eq!(reply, "fine");
}

#[tokio::test]
async fn test_concurrency_limit_rejects_excess_calls() {
    let server = faulty_server(ServerConfig::new().with_max_concurrent_calls(Some(1)));
    let client = connect(&server);

    let first = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .unary::<_, String>(&SLOW, &"first".to_string(), CallOptions::new())
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    let status = client
        .unary::<_, String>(&SLOW, &"second".to_string(), CallOptions::new())
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unavailable);
    assert_eq!(status.detail(), Some("too many concurrent calls"));

    assert_eq!(first.await.unwrap().unwrap(), "first");

    // The permit is released once the first call completes.
    let reply: String = client
        .unary(&SLOW, &"third".to_string(), CallOptions::new())
        .await
        .unwrap();
    assert_eq!(reply, "third");
}
