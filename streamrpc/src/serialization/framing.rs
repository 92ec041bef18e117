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

//! Length-prefixed framing for multiplexing calls over one transport.
//!
//! # Protocol
//!
//! ```text
//! +-------------------+------------------+-------------------+
//! | call id (u64 BE)  | length (u32 BE)  | payload (N bytes) |
//! +-------------------+------------------+-------------------+
//! ```
//!
//! The payload is an encoded [`FrameKind`](crate::connection::FrameKind); this
//! module only moves opaque bytes and knows nothing about what they mean.
//!
//! # Examples
//!
//! ```rust
//! use streamrpc::call::CallId;
//! use streamrpc::serialization::framing::{RawFrame, MAX_FRAME_SIZE};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut wire = Vec::new();
//! RawFrame::new(CallId::from(7), b"hi".to_vec())
//!     .write_to(&mut wire, MAX_FRAME_SIZE)
//!     .await?;
//!
//! let mut reader = &wire[..];
//! let frame = RawFrame::read_from(&mut reader, MAX_FRAME_SIZE).await?.unwrap();
//! assert_eq!(frame.call_id, CallId::from(7));
//! assert_eq!(frame.payload, b"hi");
//! # Ok(())
//! # }
//! ```

use crate::call::CallId;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default maximum payload size of a single frame (16 MiB).
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Size of the call id field.
pub const CALL_ID_SIZE: usize = 8;

/// Size of the length field.
pub const LENGTH_SIZE: usize = 4;

/// Total header size preceding every payload.
pub const FRAME_HEADER_SIZE: usize = CALL_ID_SIZE + LENGTH_SIZE;

/// Errors moving frames on or off the wire.
#[derive(Debug, Error)]
pub enum FramingError {
    /// The payload is larger than the configured limit.
    #[error("frame payload of {size} bytes exceeds limit of {max}")]
    TooLarge {
        /// Announced or actual payload size
        size: usize,
        /// Configured limit
        max: u32,
    },

    /// The stream ended in the middle of a frame.
    #[error("stream ended inside a frame")]
    Truncated,

    /// The underlying transport failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// One frame as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    /// Call this frame belongs to.
    pub call_id: CallId,
    /// Encoded frame body.
    pub payload: Vec<u8>,
}

impl RawFrame {
    /// Creates a frame.
    pub fn new(call_id: CallId, payload: Vec<u8>) -> Self {
        Self { call_id, payload }
    }

    /// Encodes header and payload into one contiguous buffer.
    ///
    /// # Errors
    ///
    /// Returns [`FramingError::TooLarge`] if the payload exceeds `max_size`.
    pub fn encode(&self, max_size: u32) -> Result<Vec<u8>, FramingError> {
        let len = self.checked_len(max_size)?;
        let mut buf = Vec::with_capacity(FRAME_HEADER_SIZE + self.payload.len());
        buf.extend_from_slice(&self.call_id.as_u64().to_be_bytes());
        buf.extend_from_slice(&len.to_be_bytes());
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    /// Writes the frame with a single `write_all`. Does not flush.
    pub async fn write_to<W>(&self, writer: &mut W, max_size: u32) -> Result<(), FramingError>
    where
        W: AsyncWrite + Unpin,
    {
        let buf = self.encode(max_size)?;
        writer.write_all(&buf).await?;
        Ok(())
    }

    /// Reads the next frame.
    ///
    /// Returns `Ok(None)` if the stream ends cleanly on a frame boundary.
    ///
    /// # Errors
    ///
    /// - [`FramingError::Truncated`] if the stream ends mid-frame
    /// - [`FramingError::TooLarge`] if the announced length exceeds `max_size`
    pub async fn read_from<R>(reader: &mut R, max_size: u32) -> Result<Option<Self>, FramingError>
    where
        R: AsyncRead + Unpin,
    {
        let mut header = [0u8; FRAME_HEADER_SIZE];
        if !read_header(reader, &mut header).await? {
            return Ok(None);
        }

        let (id_bytes, len_bytes) = header.split_at(CALL_ID_SIZE);
        let mut id = [0u8; CALL_ID_SIZE];
        id.copy_from_slice(id_bytes);
        let mut len = [0u8; LENGTH_SIZE];
        len.copy_from_slice(len_bytes);

        let call_id = CallId::from(u64::from_be_bytes(id));
        let payload_len = u32::from_be_bytes(len);
        if payload_len > max_size {
            return Err(FramingError::TooLarge {
                size: payload_len as usize,
                max: max_size,
            });
        }

        let mut payload = vec![0u8; payload_len as usize];
        reader.read_exact(&mut payload).await.map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                FramingError::Truncated
            } else {
                FramingError::Io(e)
            }
        })?;

        Ok(Some(Self { call_id, payload }))
    }

    fn checked_len(&self, max_size: u32) -> Result<u32, FramingError> {
        u32::try_from(self.payload.len())
            .ok()
            .filter(|len| *len <= max_size)
            .ok_or(FramingError::TooLarge {
                size: self.payload.len(),
                max: max_size,
            })
    }
}

/// Fills `header`; `false` means EOF before the first byte.
async fn read_header<R>(reader: &mut R, header: &mut [u8]) -> Result<bool, FramingError>
where
    R: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < header.len() {
        let n = reader.read(&mut header[filled..]).await?;
        if n == 0 {
            return if filled == 0 {
                Ok(false)
            } else {
                Err(FramingError::Truncated)
            };
        }
        filled += n;
    }
    Ok(true)
}
