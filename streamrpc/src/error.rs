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

//! Top-level error type.
//!
//! Errors are layered the same way the library is:
//!
//! - [`TransportError`]: the connection itself failed or could not be secured
//! - [`CallError`]: one call failed or was misused; other calls are unaffected
//! - [`ConfigError`]: startup configuration was invalid
//!
//! [`RpcError`] composes the three for code that drives a whole client or
//! server, such as the bundled binaries.

use crate::call::{CallError, Status};
use crate::config::ConfigError;
use crate::server::ServiceError;
use crate::transport::TransportError;
use std::error::Error as StdError;
use std::fmt;

/// Any error produced by this crate.
#[derive(Debug)]
pub enum RpcError {
    /// The transport failed.
    ///
    /// All calls on the connection end with it.
    ///
    /// ```rust
    /// use streamrpc::RpcError;
    /// use streamrpc::transport::TransportError;
    ///
    /// let error = RpcError::Transport(TransportError::from(std::io::Error::from(
    ///     std::io::ErrorKind::BrokenPipe,
    /// )));
    /// assert!(error.is_transport_error());
    /// assert!(error.should_close_transport());
    /// ```
    Transport(TransportError),

    /// A single call failed.
    ///
    /// ```rust
    /// use streamrpc::RpcError;
    /// use streamrpc::call::Status;
    ///
    /// let error = RpcError::from(Status::deadline_exceeded("late"));
    /// assert!(error.is_call_error());
    /// assert!(error.is_recoverable());
    /// ```
    Call(CallError),

    /// Configuration was rejected.
    Config(ConfigError),
}

impl RpcError {
    /// Returns `true` if this is a transport error.
    #[must_use]
    pub const fn is_transport_error(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Returns `true` if this is a call error.
    #[must_use]
    pub const fn is_call_error(&self) -> bool {
        matches!(self, Self::Call(_))
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns `true` if retrying the same operation may succeed.
    ///
    /// Transient transport failures and calls that ran out of time are
    /// retryable. Cancellation, protocol misuse, internal faults and bad
    /// configuration are not.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_recoverable(),
            Self::Call(e) => e.status().is_some_and(Status::is_retryable),
            Self::Config(_) => false,
        }
    }

    /// Returns `true` if the connection should be torn down.
    #[must_use]
    pub fn should_close_transport(&self) -> bool {
        match self {
            Self::Transport(e) => e.should_close_transport(),
            Self::Call(_) | Self::Config(_) => false,
        }
    }

    /// The call status this error represents, if any.
    ///
    /// Transport errors map to `UNAVAILABLE`; configuration errors have no
    /// call status.
    pub fn status(&self) -> Option<Status> {
        match self {
            Self::Transport(e) => Some(Status::unavailable(e.to_string())),
            Self::Call(e) => Some(match e {
                CallError::Status(status) => status.clone(),
                other => Status::internal(other.to_string()),
            }),
            Self::Config(_) => None,
        }
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport error: {}", e),
            Self::Call(e) => write!(f, "call error: {}", e),
            Self::Config(e) => write!(f, "configuration error: {}", e),
        }
    }
}

impl StdError for RpcError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Self::Transport(e) => Some(e),
            Self::Call(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

impl From<TransportError> for RpcError {
    fn from(error: TransportError) -> Self {
        Self::Transport(error)
    }
}

impl From<CallError> for RpcError {
    fn from(error: CallError) -> Self {
        Self::Call(error)
    }
}

impl From<Status> for RpcError {
    fn from(status: Status) -> Self {
        Self::Call(CallError::Status(status))
    }
}

impl From<ConfigError> for RpcError {
    fn from(error: ConfigError) -> Self {
        Self::Config(error)
    }
}

impl From<ServiceError> for RpcError {
    fn from(error: ServiceError) -> Self {
        Self::Config(ConfigError::from(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::{Code, MethodShape};
    use std::time::Duration;

    #[test]
    fn test_classification() {
        let transport = RpcError::Transport(TransportError::invalid_certificate("expired"));
        assert!(transport.is_transport_error());
        assert!(!transport.is_call_error());

        let call = RpcError::from(CallError::StreamClosed);
        assert!(call.is_call_error());
        assert!(!call.should_close_transport());

        let config = RpcError::from(ConfigError::Invalid {
            field: "max_frame_size",
            reason: "must be positive".to_string(),
        });
        assert!(config.is_config_error());
        assert!(config.status().is_none());
    }

    #[test]
    fn test_recoverability() {
        assert!(RpcError::from(Status::deadline_exceeded("late")).is_recoverable());
        assert!(!RpcError::from(Status::cancelled("stop")).is_recoverable());
        assert!(!RpcError::from(Status::internal("boom")).is_recoverable());
        assert!(
            RpcError::Transport(TransportError::Timeout {
                operation: "connect",
                duration: Duration::from_secs(1)
            })
            .is_recoverable()
        );
        assert!(!RpcError::Transport(TransportError::invalid_certificate("expired")).is_recoverable());
    }

    #[test]
    fn test_status_mapping() {
        let limit = RpcError::from(CallError::SendLimitExceeded {
            shape: MethodShape::Unary,
            limit: 1,
        });
        assert_eq!(limit.status().unwrap().code(), Code::Internal);

        let lost = RpcError::Transport(TransportError::from(std::io::Error::from(
            std::io::ErrorKind::ConnectionReset,
        )));
        assert_eq!(lost.status().unwrap().code(), Code::Unavailable);
    }

    #[test]
    fn test_display_and_source() {
        let error = RpcError::from(Status::unavailable("gone"));
        assert_eq!(error.to_string(), "call error: UNAVAILABLE: gone");
        assert!(error.source().is_some());
    }
}
