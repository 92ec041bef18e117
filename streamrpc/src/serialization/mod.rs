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

//! Message encoding and wire framing.
//!
//! Two concerns live here:
//!
//! - **Encoding**: the [`Serializer`] trait turns serde types into bytes.
//!   [`PostcardSerializer`] and [`JsonSerializer`] implement it, and [`Codec`]
//!   picks one of them at runtime.
//! - **Framing**: [`framing`] wraps encoded bytes with a call id and a length
//!   so many calls can share one transport.

mod codec;
mod error;
pub mod framing;
mod json;
mod postcard;
mod traits;

pub use codec::Codec;
pub use error::{DeserializationError, SerializationError};
pub use framing::{FramingError, RawFrame};
pub use json::JsonSerializer;
pub use postcard::PostcardSerializer;
pub use traits::Serializer;
