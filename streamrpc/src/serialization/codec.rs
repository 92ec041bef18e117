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

//! Runtime selection of the wire format.

use crate::serialization::{
    DeserializationError, JsonSerializer, PostcardSerializer, SerializationError, Serializer,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The wire format a connection uses, chosen at configuration time.
///
/// `Codec` is itself a [`Serializer`], so connections and sessions can hold a
/// plain `Codec` value instead of being generic over the format.
///
/// ```rust
/// use streamrpc::serialization::{Codec, Serializer};
///
/// let codec: Codec = "json".parse().unwrap();
/// assert_eq!(codec.name(), "json");
/// assert_eq!(Codec::default(), Codec::Postcard);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Codec {
    /// Compact binary encoding via `postcard`.
    #[default]
    Postcard,
    /// Text encoding via `serde_json`.
    Json,
}

impl Serializer for Codec {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        match self {
            Codec::Postcard => PostcardSerializer::new().serialize(value),
            Codec::Json => JsonSerializer::new().serialize(value),
        }
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned,
    {
        match self {
            Codec::Postcard => PostcardSerializer::new().deserialize(bytes),
            Codec::Json => JsonSerializer::new().deserialize(bytes),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Codec::Postcard => "postcard",
            Codec::Json => "json",
        }
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Codec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postcard" => Ok(Codec::Postcard),
            "json" => Ok(Codec::Json),
            other => Err(format!(
                "unknown codec '{}', expected 'postcard' or 'json'",
                other
            )),
        }
    }
}
