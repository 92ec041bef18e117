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

//! Errors reported by session operations.

use crate::call::{MethodShape, Status};
use crate::serialization::{DeserializationError, SerializationError};
use thiserror::Error;

/// Error returned by a single send or receive on a call.
///
/// Two families are kept apart:
///
/// - **Protocol violations** ([`StreamClosed`](CallError::StreamClosed),
///   [`SendLimitExceeded`](CallError::SendLimitExceeded), encoding failures)
///   are local programming errors. They are returned to the code that made
///   the mistake and do not by themselves end the call.
/// - **Terminal statuses** ([`Status`](CallError::Status)) mean the call is
///   over: cancelled, past its deadline, or failed on the other side.
#[derive(Debug, Error)]
pub enum CallError {
    /// The sending direction was already closed.
    #[error("send on a closed stream")]
    StreamClosed,

    /// The call shape does not allow another message in this direction.
    #[error("{shape} call allows at most {limit} message(s) in this direction")]
    SendLimitExceeded {
        /// Shape of the call
        shape: MethodShape,
        /// Messages allowed
        limit: u64,
    },

    /// The call ended with a non-OK status.
    #[error(transparent)]
    Status(#[from] Status),

    /// An outgoing message could not be encoded.
    #[error(transparent)]
    Encode(#[from] SerializationError),

    /// An incoming message could not be decoded.
    #[error(transparent)]
    Decode(#[from] DeserializationError),
}

impl CallError {
    /// `true` for errors caused by misuse of the session.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            CallError::StreamClosed | CallError::SendLimitExceeded { .. } | CallError::Encode(_)
        )
    }

    /// The terminal status, if this error carries one.
    pub fn status(&self) -> Option<&Status> {
        match self {
            CallError::Status(status) => Some(status),
            _ => None,
        }
    }
}

impl From<CallError> for Status {
    fn from(error: CallError) -> Self {
        match error {
            CallError::Status(status) => status,
            other => Status::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::Code;

    #[test]
    fn test_status_passes_through() {
        let error = CallError::from(Status::deadline_exceeded("late"));
        assert!(!error.is_protocol_violation());
        assert_eq!(Status::from(error).code(), Code::DeadlineExceeded);
    }

    #[test]
    fn test_violations_become_internal() {
        let error = CallError::SendLimitExceeded {
            shape: MethodShape::Unary,
            limit: 1,
        };
        assert!(error.is_protocol_violation());
        assert_eq!(
            error.to_string(),
            "unary call allows at most 1 message(s) in this direction"
        );

        let status = Status::from(error);
        assert_eq!(status.code(), Code::Internal);
    }

    #[test]
    fn test_decode_error_is_not_a_violation() {
        let error = CallError::from(DeserializationError::TooLarge { size: 8, limit: 4 });
        assert!(!error.is_protocol_violation());
        assert!(error.status().is_none());
    }
}
