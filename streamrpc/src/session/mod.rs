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

//! Per-call message flow.
//!
//! A [`StreamSession`] carries the messages of one call in both directions
//! and tracks half-close state:
//!
//! ```text
//!              close_send()                 peer half-close
//!   Open ─────────────────► HalfClosedBySelf ──────────────► Closed
//!    │                                                         ▲
//!    │ peer half-close                         close_send()    │
//!    └──────────────────► HalfClosedByPeer ────────────────────┘
//! ```
//!
//! A terminal status moves the session to `Closed` from any state.
//!
//! [`MessageStream`] and [`MessageSink`] are typed wrappers over the two
//! halves of a split session.

#[allow(clippy::module_inception)]
mod session;
mod state;
mod stream;

pub use session::{SessionReceiver, SessionSender, StreamSession};
pub use state::StreamState;
pub use stream::{MessageSink, MessageStream};
