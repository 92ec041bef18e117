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

//! Identity and metadata types shared by all transports.

use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TRANSPORT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a transport, used to correlate log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportId(u64);

impl TransportId {
    /// Allocates the next id.
    pub fn next() -> Self {
        Self(NEXT_TRANSPORT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl From<u64> for TransportId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TransportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// What a transport is built on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Plain TCP.
    Tcp,
    /// TLS over another transport.
    Tls,
    /// In-process pipe.
    Memory,
}

impl TransportKind {
    /// `true` if bytes are encrypted and the peer was authenticated.
    pub fn is_secure(self) -> bool {
        matches!(self, TransportKind::Tls)
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TransportKind::Tcp => "tcp",
            TransportKind::Tls => "tls",
            TransportKind::Memory => "memory",
        })
    }
}

/// Where a transport leads and how it is secured.
#[derive(Debug, Clone)]
pub struct TransportMetadata {
    /// Identifier for logs.
    pub id: TransportId,
    /// Underlying kind.
    pub kind: TransportKind,
    /// Local socket address, if any.
    pub local_addr: Option<SocketAddr>,
    /// Remote socket address, if any.
    pub peer_addr: Option<SocketAddr>,
}

impl TransportMetadata {
    /// Metadata for a fresh transport of `kind` with no addresses.
    pub fn new(kind: TransportKind) -> Self {
        Self {
            id: TransportId::next(),
            kind,
            local_addr: None,
            peer_addr: None,
        }
    }

    /// Sets both socket addresses.
    pub fn with_addrs(mut self, local: Option<SocketAddr>, peer: Option<SocketAddr>) -> Self {
        self.local_addr = local;
        self.peer_addr = peer;
        self
    }

    /// The same endpoints seen through a TLS layer.
    pub fn secured(&self) -> Self {
        Self {
            id: self.id,
            kind: TransportKind::Tls,
            local_addr: self.local_addr,
            peer_addr: self.peer_addr,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(TransportId::next(), TransportId::next());
        assert_eq!(TransportId::from(7).to_string(), "T7");
    }

    #[test]
    fn test_secured_keeps_identity() {
        let peer = "127.0.0.1:50051".parse().unwrap();
        let tcp = TransportMetadata::new(TransportKind::Tcp).with_addrs(None, Some(peer));
        assert!(!tcp.kind.is_secure());

        let tls = tcp.secured();
        assert_eq!(tls.id, tcp.id);
        assert_eq!(tls.kind, TransportKind::Tls);
        assert_eq!(tls.peer_addr, Some(peer));
        assert!(tls.kind.is_secure());
    }
}
