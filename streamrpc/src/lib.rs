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

#![doc = include_str!("../../README.md")]
#![allow(clippy::module_inception)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! ## Architecture
//!
//! - **[`transport`]**: byte streams (TCP, TLS, in-memory) and the secure
//!   channel entry points
//! - **[`serialization`]**: message encoding and frame layout
//! - **[`connection`]**: many calls multiplexed over one transport
//! - **[`call`]**: call identity, descriptors, status and context
//! - **[`session`]**: the per-call message flow and half-close state
//! - **[`server`]**: services, dispatch and the accept loop
//! - **[`client`]**: one invoker per call shape
//! - **[`config`]**: server and client settings
//! - **[`observability`]**: logging setup and call metrics
//! - **[`greet`]**: the bundled greeting service

pub mod call;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod greet;
pub mod observability;
pub mod serialization;
pub mod server;
pub mod session;
pub mod transport;

pub use call::{CallContext, CallError, Code, Metadata, MethodDescriptor, MethodShape, Status};
pub use client::{CallOptions, Client};
pub use config::{ClientConfig, ConfigError, ServerConfig};
pub use error::RpcError;
pub use observability::{CallMetrics, init_tracing, log_error};
pub use server::{Server, Service, ServiceBuilder};
pub use session::{MessageSink, MessageStream, StreamSession};
pub use transport::{Transport, TransportError};
