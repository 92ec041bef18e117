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

//! Errors raised while establishing or using a transport.
//!
//! Every transport failure falls into one of three groups:
//!
//! - the peer could not be reached or the address could not be bound
//! - the peer could not be authenticated, or our own certificate material is
//!   unusable ([`TransportError::is_security_failure`])
//! - the established byte stream failed underneath the calls
//!
//! The first two never produce a transport; callers can rely on a security
//! failure never being reported as an ordinary connection failure.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur in the transport layer.
///
/// # Examples
///
/// ```rust
/// use streamrpc::transport::TransportError;
/// use std::io;
///
/// let error = TransportError::ConnectionFailed {
///     address: "127.0.0.1:50051".to_string(),
///     source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
/// };
/// assert!(error.is_recoverable());
/// assert!(!error.is_security_failure());
/// ```
#[derive(Debug, Error)]
pub enum TransportError {
    /// The remote endpoint could not be reached.
    #[error("failed to connect to {address}: {source}")]
    ConnectionFailed {
        /// Address that was dialled
        address: String,
        /// Cause reported by the socket
        #[source]
        source: io::Error,
    },

    /// The listening address could not be bound.
    #[error("failed to bind to {address}: {source}")]
    BindFailed {
        /// Address that was requested
        address: String,
        /// Cause reported by the socket
        #[source]
        source: io::Error,
    },

    /// The TLS handshake with the peer failed.
    ///
    /// Covers an untrusted or mismatched peer certificate as well as
    /// protocol-level handshake failures.
    #[error("TLS handshake with {peer} failed: {source}")]
    HandshakeFailed {
        /// Peer address or server name
        peer: String,
        /// TLS failure wrapped by the stream
        #[source]
        source: io::Error,
    },

    /// Certificate, private key or trust anchor material could not be used.
    #[error("invalid certificate material: {reason}")]
    InvalidCertificate {
        /// What was wrong with the material
        reason: String,
    },

    /// The TLS configuration could not be built or was used in the wrong
    /// role.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        /// What was wrong
        reason: String,
    },

    /// Establishing the channel took too long.
    #[error("{operation} timed out after {duration:?}")]
    Timeout {
        /// What was being waited for
        operation: &'static str,
        /// Limit that was exceeded
        duration: Duration,
    },

    /// The byte stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    /// Returns `true` if the operation may succeed when retried.
    ///
    /// Security failures are never recoverable: the same peer checked against
    /// the same trust anchor fails the same way.
    pub fn is_recoverable(&self) -> bool {
        match self {
            TransportError::ConnectionFailed { .. } | TransportError::Timeout { .. } => true,
            TransportError::Io(e) => is_transient(e),
            TransportError::BindFailed { .. }
            | TransportError::HandshakeFailed { .. }
            | TransportError::InvalidCertificate { .. }
            | TransportError::InvalidConfiguration { .. } => false,
        }
    }

    /// Returns `true` if a transport that reported this error is unusable.
    pub fn should_close_transport(&self) -> bool {
        match self {
            TransportError::Io(e) => !is_transient(e),
            TransportError::HandshakeFailed { .. } | TransportError::Timeout { .. } => true,
            // Nothing was established.
            TransportError::ConnectionFailed { .. }
            | TransportError::BindFailed { .. }
            | TransportError::InvalidCertificate { .. }
            | TransportError::InvalidConfiguration { .. } => false,
        }
    }

    /// Returns `true` if peer authentication or certificate validation failed.
    #[must_use]
    pub const fn is_security_failure(&self) -> bool {
        matches!(
            self,
            TransportError::HandshakeFailed { .. } | TransportError::InvalidCertificate { .. }
        )
    }

    pub(crate) fn invalid_certificate(reason: impl Into<String>) -> Self {
        TransportError::InvalidCertificate {
            reason: reason.into(),
        }
    }

    pub(crate) fn wrong_tls_role(expected: &str) -> Self {
        TransportError::InvalidConfiguration {
            reason: format!("expected a {} TLS configuration", expected),
        }
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refused_connection_is_retryable() {
        let error = TransportError::ConnectionFailed {
            address: "127.0.0.1:50051".to_string(),
            source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
        };
        assert!(error.is_recoverable());
        assert!(!error.should_close_transport());
        assert!(!error.is_security_failure());
        assert!(error.to_string().starts_with("failed to connect to 127.0.0.1:50051"));
    }

    #[test]
    fn test_rejected_handshake_is_final() {
        let error = TransportError::HandshakeFailed {
            peer: "localhost".to_string(),
            source: io::Error::new(io::ErrorKind::InvalidData, "unknown issuer"),
        };
        assert!(error.is_security_failure());
        assert!(!error.is_recoverable());
        assert!(error.should_close_transport());
    }

    #[test]
    fn test_bad_key_material() {
        let error = TransportError::invalid_certificate("no private key found");
        assert!(error.is_security_failure());
        assert!(!error.is_recoverable());
        assert!(error.to_string().contains("no private key found"));
    }

    #[test]
    fn test_io_errors_by_kind() {
        let interrupted = TransportError::from(io::Error::from(io::ErrorKind::Interrupted));
        assert!(interrupted.is_recoverable());
        assert!(!interrupted.should_close_transport());

        let broken = TransportError::from(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(!broken.is_recoverable());
        assert!(broken.should_close_transport());
    }

    #[test]
    fn test_timeout_names_operation() {
        let error = TransportError::Timeout {
            operation: "secure connect",
            duration: Duration::from_secs(10),
        };
        assert_eq!(error.to_string(), "secure connect timed out after 10s");
        assert!(error.is_recoverable());
    }

    #[test]
    fn test_wrong_tls_role() {
        let error = TransportError::wrong_tls_role("server");
        assert!(matches!(error, TransportError::InvalidConfiguration { .. }));
        assert!(!error.is_security_failure());
    }
}
