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

//! The vocabulary of a call.
//!
//! A call is one invocation of a [`MethodDescriptor`]. It carries a
//! [`CallId`] unique on its connection, optional [`Metadata`] and deadline,
//! and ends with exactly one [`Status`]. The [`CallContext`] ties these
//! together and doubles as the cancellation token handed to handlers.

mod context;
mod error;
mod id;
mod metadata;
mod method;
mod status;

pub use context::CallContext;
pub use error::CallError;
pub use id::CallId;
pub(crate) use id::CallIdGenerator;
pub use metadata::Metadata;
pub use method::{MethodDescriptor, MethodShape, ServiceDescriptor};
pub use status::{Code, Status};
