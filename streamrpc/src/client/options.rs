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

use crate::call::Metadata;
use std::time::Duration;
use tokio::time::Instant;

/// When a call must be finished by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// A fixed point in time.
    At(Instant),
    /// A duration measured from when the call is opened.
    After(Duration),
}

impl Deadline {
    /// The absolute deadline for a call opened at `opened_at`.
    pub fn resolve(self, opened_at: Instant) -> Instant {
        match self {
            Deadline::At(instant) => instant,
            Deadline::After(timeout) => opened_at + timeout,
        }
    }
}

/// Parameters fixed when a call is opened.
///
/// ```rust
/// use std::time::Duration;
/// use streamrpc::client::CallOptions;
///
/// let options = CallOptions::new()
///     .with_timeout(Duration::from_secs(1))
///     .with_metadata("key", "test-run");
/// assert_eq!(options.metadata().get("key"), Some("test-run"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub(crate) deadline: Option<Deadline>,
    pub(crate) metadata: Metadata,
}

impl CallOptions {
    /// No deadline and no metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ends the call with `DEADLINE_EXCEEDED` if it is not done within
    /// `timeout` of being opened.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Deadline::After(timeout));
        self
    }

    /// Ends the call with `DEADLINE_EXCEEDED` if it is not done by `deadline`.
    pub fn with_deadline(mut self, deadline: std::time::Instant) -> Self {
        self.deadline = Some(Deadline::At(Instant::from_std(deadline)));
        self
    }

    /// Adds one metadata entry. The server sees it on the call's context.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key, value);
        self
    }

    /// Deadline, if one was set.
    pub fn deadline(&self) -> Option<Deadline> {
        self.deadline
    }

    /// Metadata to send.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_deadline_resolves_from_open_time() {
        let opened = Instant::now();
        let deadline = CallOptions::new()
            .with_timeout(Duration::from_millis(250))
            .deadline()
            .unwrap();
        assert_eq!(deadline.resolve(opened), opened + Duration::from_millis(250));
    }

    #[test]
    fn test_absolute_deadline_is_kept() {
        let at = std::time::Instant::now() + Duration::from_secs(3);
        let deadline = CallOptions::new().with_deadline(at).deadline().unwrap();
        assert_eq!(deadline.resolve(Instant::now()), Instant::from_std(at));
    }

    #[test]
    fn test_metadata_accumulates() {
        let options = CallOptions::new().with_metadata("a", "1").with_metadata("b", "2");
        assert_eq!(options.metadata().len(), 2);
        assert!(options.deadline().is_none());
    }
}
