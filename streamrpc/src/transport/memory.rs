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

//! In-memory transport implementation for testing.
//!
//! Connects a client and a server in the same process without a socket. The
//! pair is backed by [`tokio::io::duplex`], so a full buffer applies real
//! backpressure to the writer just like a congested socket would.

use crate::transport::{Transport, TransportKind, TransportMetadata};
use tokio::io::DuplexStream;

/// Default per-direction buffer size in bytes.
const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// In-memory transport.
///
/// # Examples
///
/// ```rust
/// use streamrpc::transport::MemoryTransport;
/// use tokio::io::{AsyncReadExt, AsyncWriteExt};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (mut client, mut server) = MemoryTransport::pair(1024);
///
/// client.write_all(b"Hello!").await?;
///
/// let mut buffer = vec![0u8; 1024];
/// let n = server.read(&mut buffer).await?;
/// assert_eq!(&buffer[..n], b"Hello!");
/// # Ok(())
/// # }
/// ```
pub struct MemoryTransport {
    metadata: TransportMetadata,
    stream: DuplexStream,
}

impl MemoryTransport {
    /// Creates a pair of connected memory transports.
    ///
    /// `buffer_size` is the number of bytes each direction can hold before
    /// writes start waiting for the reader.
    pub fn pair(buffer_size: usize) -> (Self, Self) {
        let (a, b) = tokio::io::duplex(buffer_size);

        let end = |stream| Self {
            metadata: TransportMetadata::new(TransportKind::Memory),
            stream,
        };
        (end(a), end(b))
    }

    /// Creates a connected pair with the default buffer size.
    pub fn pair_default() -> (Self, Self) {
        Self::pair(DEFAULT_BUFFER_SIZE)
    }
}

impl Transport for MemoryTransport {
    fn metadata(&self) -> &TransportMetadata {
        &self.metadata
    }
}

forward_async_io!(MemoryTransport);



#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::CallId;
    use crate::serialization::framing::{MAX_FRAME_SIZE, RawFrame};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_frames_flow_both_ways() {
        let (mut client, mut server) = MemoryTransport::pair_default();

        RawFrame::new(CallId::from(1), b"request".to_vec())
            .write_to(&mut client, MAX_FRAME_SIZE)
            .await
            .unwrap();
        let request = RawFrame::read_from(&mut server, MAX_FRAME_SIZE)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.payload, b"request");

        RawFrame::new(request.call_id, b"reply".to_vec())
            .write_to(&mut server, MAX_FRAME_SIZE)
            .await
            .unwrap();
        let reply = RawFrame::read_from(&mut client, MAX_FRAME_SIZE)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.call_id, CallId::from(1));
        assert_eq!(reply.payload, b"reply");
    }

    #[tokio::test]
    async fn test_dropped_peer_reads_as_eof() {
        let (client, mut server) = MemoryTransport::pair_default();
        drop(client);
        assert_eq!(server.read(&mut [0u8; 8]).await.unwrap(), 0);
    }

    #[test]
    fn test_each_end_has_its_own_identity() {
        let (client, server) = MemoryTransport::pair_default();
        assert_eq!(client.metadata().kind, TransportKind::Memory);
        assert!(!client.metadata().kind.is_secure());
        assert!(client.metadata().peer_addr.is_none());
        assert_ne!(client.metadata().id, server.metadata().id);
    }

    #[tokio::test]
    async fn test_full_buffer_blocks_writer() {
        let (mut client, mut server) = MemoryTransport::pair(4);
        client.write_all(b"full").await.unwrap();

        let pending = tokio::spawn(async move {
            client.write_all(b"more").await.unwrap();
            client
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!pending.is_finished());

        let mut buffer = [0u8; 8];
        server.read_exact(&mut buffer).await.unwrap();
        assert_eq!(&buffer, b"fullmore");
        let _client = pending.await.unwrap();
    }
}
