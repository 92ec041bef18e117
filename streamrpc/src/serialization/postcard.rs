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

//! Compact binary wire format based on `postcard`.

use crate::serialization::{DeserializationError, SerializationError, Serializer};

/// [`Serializer`] backed by `postcard`.
///
/// This is the default wire format. An optional size limit rejects oversized
/// input before decoding starts.
#[derive(Clone, Debug, Default)]
pub struct PostcardSerializer {
    max_size: Option<usize>,
}

impl PostcardSerializer {
    /// Creates a serializer without a size limit.
    pub fn new() -> Self {
        Self { max_size: None }
    }

    /// Rejects input larger than `max_size` bytes.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }
}

impl Serializer for PostcardSerializer {
    fn serialize<T>(&self, value: &T) -> Result<Vec<u8>, SerializationError>
    where
        T: serde::Serialize + ?Sized,
    {
        Ok(postcard::to_allocvec(value)?)
    }

    fn deserialize<T>(&self, bytes: &[u8]) -> Result<T, DeserializationError>
    where
        T: serde::de::DeserializeOwned,
    {
        if let Some(max_size) = self.max_size {
            if bytes.len() > max_size {
                return Err(DeserializationError::TooLarge {
                    size: bytes.len(),
                    limit: max_size,
                });
            }
        }
        Ok(postcard::from_bytes(bytes)?)
    }

    fn name(&self) -> &'static str {
        "postcard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Reply {
        result: String,
    }

    #[test]
    fn test_postcard_decodes_what_it_encodes() {
        let serializer = PostcardSerializer::new();
        let reply = Reply {
            result: "Hello Pavan".to_string(),
        };
        let bytes = serializer.serialize(&reply).unwrap();
        assert!(bytes.len() < 16);
        assert_eq!(serializer.deserialize::<Reply>(&bytes).unwrap(), reply);
    }

    #[test]
    fn test_postcard_size_limit() {
        let serializer = PostcardSerializer::new().with_max_size(4);
        let bytes = PostcardSerializer::new()
            .serialize(&Reply {
                result: "Hello Roy".to_string(),
            })
            .unwrap();
        let error = serializer.deserialize::<Reply>(&bytes).unwrap_err();
        assert!(error.to_string().contains("exceeds limit"));
    }

    #[test]
    fn test_postcard_truncated_input() {
        let serializer = PostcardSerializer::new();
        let result: Result<Reply, _> = serializer.deserialize(&[0x20, b'a']);
        assert!(result.is_err());
    }
}
