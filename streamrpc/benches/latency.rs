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

//! Latency benchmarks for streamrpc
//!
//! Measures call latency over an in-memory transport, so the numbers cover
//! framing, multiplexing and dispatch without network noise:
//! - Unary round-trip for different payload sizes and codecs
//! - Server stream of 100 messages
//! - Raw frame encoding

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use futures_util::StreamExt;
use streamrpc::call::{CallContext, CallId, MethodDescriptor, MethodShape, ServiceDescriptor, Status};
use streamrpc::connection::ConnectionConfig;
use streamrpc::serialization::{Codec, RawFrame};
use streamrpc::transport::MemoryTransport;
use streamrpc::{CallOptions, Client, MessageSink, Server, ServerConfig, Service};

const ECHO: MethodDescriptor =
    MethodDescriptor::new("/bench.Echo/Echo", MethodShape::Unary, "bytes", "bytes");
const REPEAT: MethodDescriptor = MethodDescriptor::new(
    "/bench.Echo/Repeat",
    MethodShape::ServerStream,
    "u32",
    "u64",
);
const SERVICE: ServiceDescriptor = ServiceDescriptor::new("bench.Echo", &[ECHO, REPEAT]);

async fn echo(_ctx: CallContext, payload: Vec<u8>) -> Result<Vec<u8>, Status> {
    Ok(payload)
}

async fn repeat(_ctx: CallContext, count: u32, mut sink: MessageSink<u64>) -> Result<(), Status> {
    for i in 0..u64::from(count) {
        sink.send(&i).await?;
    }
    Ok(())
}

/// Builds a server and a client joined by an in-memory pipe.
///
/// Must be called from inside a runtime.
fn setup(codec: Codec) -> (Server, Client) {
    let service = Service::builder(SERVICE)
        .unary(&ECHO, echo)
        .server_streaming(&REPEAT, repeat)
        .build()
        .unwrap();
    let server = Server::new(ServerConfig::new().with_codec(codec))
        .add_service(service)
        .unwrap();
    let (client_side, server_side) = MemoryTransport::pair(64 * 1024);
    server.serve_connection(server_side);
    let client = Client::new(client_side, ConnectionConfig::default().with_codec(codec));
    (server, client)
}

/// Benchmark unary round-trip latency
fn bench_unary_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("latency_unary");
    let rt = tokio::runtime::Runtime::new().unwrap();

    for codec in [Codec::Postcard, Codec::Json] {
        let (_server, client) = rt.block_on(async { setup(codec) });

        for size in [100, 1024, 10240] {
            let payload = vec![0u8; size];
            group.bench_with_input(
                BenchmarkId::new(codec.to_string(), format!("{}bytes", size)),
                &payload,
                |b, payload| {
                    b.to_async(&rt).iter(|| async {
                        let reply: Vec<u8> = client
                            .unary(&ECHO, payload, CallOptions::new())
                            .await
                            .unwrap();
                        reply
                    });
                },
            );
        }
    }

    group.finish();
}

/// Benchmark a server stream from open to final status
fn bench_server_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("latency_server_stream");
    let rt = tokio::runtime::Runtime::new().unwrap();
    let (_server, client) = rt.block_on(async { setup(Codec::Postcard) });

    group.bench_function("100_messages", |b| {
        b.to_async(&rt).iter(|| async {
            let stream = client
                .server_streaming::<u32, u64>(&REPEAT, &100, CallOptions::new())
                .await
                .unwrap();
            stream.into_stream().count().await
        });
    });

    group.finish();
}

/// Benchmark frame encoding
fn bench_frame_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("latency_frame_encoding");

    for size in [100, 1024, 10240] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}bytes", size)),
            &size,
            |b, &size| {
                let frame = RawFrame::new(CallId::from(7), vec![0u8; size]);
                b.iter(|| frame.encode(u32::MAX).unwrap());
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_unary_roundtrip,
    bench_server_stream,
    bench_frame_encoding
);
criterion_main!(benches);
