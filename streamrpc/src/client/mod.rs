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

//! Invoking calls.
//!
//! [`Client`] offers one invoker per call shape:
//!
//! | Shape         | Invoker                              | Returns                      |
//! |---------------|--------------------------------------|------------------------------|
//! | Unary         | [`Client::unary`]                    | the response                 |
//! | ServerStream  | [`Client::server_streaming`]         | a stream of responses        |
//! | ClientStream  | [`Client::client_streaming`]         | the aggregate response       |
//! | BidiStream    | [`Client::bidi_streaming`]           | once both directions finish  |
//!
//! [`Client::open`] returns the raw [`StreamSession`](crate::session::StreamSession)
//! for callers that need finer control. Deadlines and metadata are fixed at
//! open time through [`CallOptions`].

#[allow(clippy::module_inception)]
mod client;
mod options;

pub use client::Client;
pub use options::{CallOptions, Deadline};
