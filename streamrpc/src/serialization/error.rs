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

//! Errors raised while encoding or decoding message payloads.
//!
//! Both types wrap the codec's own error so the failing format is visible in
//! the message, and add a size variant for limits enforced by this crate.

use thiserror::Error;

/// A value could not be turned into bytes.
///
/// ```rust
/// use streamrpc::serialization::SerializationError;
///
/// let error = SerializationError::TooLarge { what: "MESSAGE", size: 20, limit: 16 };
/// assert_eq!(error.to_string(), "MESSAGE of 20 bytes exceeds limit of 16");
/// ```
#[derive(Debug, Error)]
pub enum SerializationError {
    /// postcard rejected the value.
    #[error("postcard encoding failed: {0}")]
    Postcard(#[from] postcard::Error),

    /// serde_json rejected the value.
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The encoded value is larger than the peer accepts.
    #[error("{what} of {size} bytes exceeds limit of {limit}")]
    TooLarge {
        /// What was being encoded
        what: &'static str,
        /// Encoded size
        size: usize,
        /// Configured limit
        limit: usize,
    },
}

/// Bytes could not be turned back into a value.
#[derive(Debug, Error)]
pub enum DeserializationError {
    /// postcard could not decode the bytes.
    #[error("postcard decoding failed: {0}")]
    Postcard(#[from] postcard::Error),

    /// serde_json could not decode the bytes.
    #[error("JSON decoding failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The input was refused before decoding.
    #[error("input of {size} bytes exceeds limit of {limit}")]
    TooLarge {
        /// Input size
        size: usize,
        /// Configured limit
        limit: usize,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_size_errors_have_no_source() {
        let error = DeserializationError::TooLarge { size: 9, limit: 4 };
        assert_eq!(error.to_string(), "input of 9 bytes exceeds limit of 4");
        assert!(error.source().is_none());
    }

    #[test]
    fn test_codec_errors_keep_source() {
        let json_error = serde_json::from_str::<u32>("nope").unwrap_err();
        let error = DeserializationError::from(json_error);
        assert!(error.to_string().starts_with("JSON decoding failed"));
        assert!(error.source().is_some());

        let postcard_error = postcard::from_bytes::<String>(&[]).unwrap_err();
        let error = DeserializationError::from(postcard_error);
        assert!(matches!(error, DeserializationError::Postcard(_)));
    }
}
