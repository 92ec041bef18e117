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

//! Serving calls.
//!
//! Handlers are plain async functions registered against method
//! descriptors with a [`ServiceBuilder`]. The [`Server`] accepts
//! connections and hands every call to the dispatcher, which:
//!
//! 1. looks the method up by its full path (an unknown method ends the call
//!    with `INTERNAL` and no handler runs)
//! 2. for unary and server-streaming methods, reads the single request
//! 3. runs the handler in its own task, so a failing or panicking handler
//!    only ends its own call
//! 4. sends the handler's result, then the call's final status
//!
//! Unless turned off in the configuration, every server also answers
//! [`reflection`] requests listing its services.
//!
//! A handler should watch [`CallContext::cancelled`](crate::call::CallContext::cancelled)
//! or poll [`CallContext::check`](crate::call::CallContext::check)
//! during long work. Once the call is cancelled or times out, the final
//! status is sent right away and any further sends by the handler fail.

mod dispatcher;
mod handler;
pub mod reflection;
#[allow(clippy::module_inception)]
mod server;
mod service;

pub use server::Server;
pub use service::{Service, ServiceBuilder, ServiceError};
