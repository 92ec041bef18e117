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

use crate::serialization::{DeserializationError, SerializationError};

/// A serde-based wire format for messages and frame bodies.
///
/// Both peers of a connection must use the same format; nothing on the wire
/// identifies which one is in use.
///
/// # Examples
///
/// ```rust
/// use streamrpc::serialization::{PostcardSerializer, Serializer};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize, Debug, PartialEq)]
/// struct Greeting {
///     first_name: String,
/// }
///
/// let serializer = PostcardSerializer::default();
/// let bytes = serializer.serialize(&Greeting { first_name: "Pavan".into() })?;
/// let decoded: Greeting = serializer.deserialize(&bytes)?;
/// assert_eq!(decoded.first_name, "Pavan");
/// assert_eq!(serializer.name(), "postcard");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub trait Serializer: Send + Sync + 'static {
    /// Encodes `value`.
    ///
    /// # Errors
    ///
    /// Returns a [`SerializationError`] if the format cannot represent the value.
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized;

    /// Decodes a value of type `T` from `bytes`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeserializationError`] if the bytes are malformed or do not
    /// describe a `T`.
    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned;

    /// Stable short name, used in logs and configuration.
    fn name(&self) -> &'static str;
}
