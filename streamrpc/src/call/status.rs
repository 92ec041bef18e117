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

//! Terminal call outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status code of a finished call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Code {
    /// The call completed normally.
    Ok,
    /// The caller aborted the call.
    Cancelled,
    /// The call's deadline passed before it completed.
    DeadlineExceeded,
    /// The connection failed underneath the call.
    Unavailable,
    /// Routing failed, the handler faulted, or the protocol was violated.
    Internal,
}

impl Code {
    /// Upper-snake-case name used in logs and metrics labels.
    pub const fn as_str(self) -> &'static str {
        match self {
            Code::Ok => "OK",
            Code::Cancelled => "CANCELLED",
            Code::DeadlineExceeded => "DEADLINE_EXCEEDED",
            Code::Unavailable => "UNAVAILABLE",
            Code::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single, immutable outcome of a call.
///
/// A `Status` travels on the wire as the last frame of a call and is also the
/// error type callers see. The predicates map onto the decision a caller has
/// to make:
///
/// - [`is_retryable`](Status::is_retryable): the deadline passed; trying again
///   with more time may work
/// - [`is_cancelled`](Status::is_cancelled): someone gave up on purpose
/// - [`is_fatal`](Status::is_fatal): the server or connection is broken
///
/// ```rust
/// use streamrpc::call::{Code, Status};
///
/// let status = Status::deadline_exceeded("deadline of 1s exceeded");
/// assert_eq!(status.code(), Code::DeadlineExceeded);
/// assert!(status.is_retryable());
/// assert!(!status.is_fatal());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    code: Code,
    detail: Option<String>,
}

impl Status {
    /// Creates a status with an optional detail message.
    pub fn new(code: Code, detail: Option<String>) -> Self {
        Self { code, detail }
    }

    /// Successful completion.
    pub fn ok() -> Self {
        Self::new(Code::Ok, None)
    }

    /// Caller-initiated abort.
    pub fn cancelled(detail: impl Into<String>) -> Self {
        Self::new(Code::Cancelled, Some(detail.into()))
    }

    /// Deadline expiry.
    pub fn deadline_exceeded(detail: impl Into<String>) -> Self {
        Self::new(Code::DeadlineExceeded, Some(detail.into()))
    }

    /// Connection-level failure.
    pub fn unavailable(detail: impl Into<String>) -> Self {
        Self::new(Code::Unavailable, Some(detail.into()))
    }

    /// Handler, routing or protocol failure.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(Code::Internal, Some(detail.into()))
    }

    /// The status code.
    pub fn code(&self) -> Code {
        self.code
    }

    /// The human-readable detail, if any.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// `true` for [`Code::Ok`].
    pub fn is_ok(&self) -> bool {
        self.code == Code::Ok
    }

    /// `true` for [`Code::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        self.code == Code::Cancelled
    }

    /// `true` for [`Code::DeadlineExceeded`].
    pub fn is_deadline_exceeded(&self) -> bool {
        self.code == Code::DeadlineExceeded
    }

    /// `true` if retrying with a longer deadline may succeed.
    pub fn is_retryable(&self) -> bool {
        self.is_deadline_exceeded()
    }

    /// `true` for failures of the server or the connection.
    pub fn is_fatal(&self) -> bool {
        matches!(self.code, Code::Internal | Code::Unavailable)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {}", self.code, detail),
            None => write!(f, "{}", self.code),
        }
    }
}

impl std::error::Error for Status {}
