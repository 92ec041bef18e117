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

//! Call and message counters.
//!
//! Counts are kept in atomics so they can be read back in tests and
//! diagnostics. With the `observability` feature they are also exported
//! through the `metrics` facade.

use crate::call::{Code, Status};
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters for calls handled by one client or server.
///
/// ```rust
/// use streamrpc::call::Status;
/// use streamrpc::observability::CallMetrics;
///
/// let metrics = CallMetrics::new();
/// metrics.record_call_started("/greet.GreetService/Greet");
/// metrics.record_call_finished("/greet.GreetService/Greet", &Status::ok());
///
/// assert_eq!(metrics.calls_started(), 1);
/// assert_eq!(metrics.calls_finished_with(streamrpc::call::Code::Ok), 1);
/// assert_eq!(metrics.active_calls(), 0);
/// ```
#[derive(Debug, Default)]
pub struct CallMetrics {
    calls_started: AtomicU64,
    calls_ok: AtomicU64,
    calls_cancelled: AtomicU64,
    calls_deadline_exceeded: AtomicU64,
    calls_unavailable: AtomicU64,
    calls_internal: AtomicU64,
    messages_sent: AtomicU64,
    messages_received: AtomicU64,
}

impl CallMetrics {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a call was opened or accepted.
    #[cfg_attr(not(feature = "observability"), allow(unused_variables))]
    pub fn record_call_started(&self, method: &str) {
        self.calls_started.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!("streamrpc.calls.started", "method" => method.to_string())
                .increment(1);
            metrics::gauge!("streamrpc.calls.active").increment(1.0);
        }
    }

    /// Records the terminal status of a call.
    #[cfg_attr(not(feature = "observability"), allow(unused_variables))]
    pub fn record_call_finished(&self, method: &str, status: &Status) {
        self.counter_for(status.code()).fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        {
            metrics::counter!(
                "streamrpc.calls.finished",
                "method" => method.to_string(),
                "code" => status.code().as_str()
            )
            .increment(1);
            metrics::gauge!("streamrpc.calls.active").decrement(1.0);
        }
    }

    /// Records one outbound message.
    pub fn record_message_sent(&self) {
        self.messages_sent.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("streamrpc.messages.sent").increment(1);
    }

    /// Records one inbound message.
    pub fn record_message_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        #[cfg(feature = "observability")]
        metrics::counter!("streamrpc.messages.received").increment(1);
    }

    /// Calls started so far.
    pub fn calls_started(&self) -> u64 {
        self.calls_started.load(Ordering::Relaxed)
    }

    /// Calls that finished with `code`.
    pub fn calls_finished_with(&self, code: Code) -> u64 {
        self.counter_for(code).load(Ordering::Relaxed)
    }

    /// Calls finished with any status.
    pub fn calls_finished(&self) -> u64 {
        [
            Code::Ok,
            Code::Cancelled,
            Code::DeadlineExceeded,
            Code::Unavailable,
            Code::Internal,
        ]
        .into_iter()
        .map(|code| self.calls_finished_with(code))
        .sum()
    }

    /// Calls started but not yet finished.
    pub fn active_calls(&self) -> u64 {
        self.calls_started().saturating_sub(self.calls_finished())
    }

    /// Messages sent so far.
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    /// Messages received so far.
    pub fn messages_received(&self) -> u64 {
        self.messages_received.load(Ordering::Relaxed)
    }

    fn counter_for(&self, code: Code) -> &AtomicU64 {
        match code {
            Code::Ok => &self.calls_ok,
            Code::Cancelled => &self.calls_cancelled,
            Code::DeadlineExceeded => &self.calls_deadline_exceeded,
            Code::Unavailable => &self.calls_unavailable,
            Code::Internal => &self.calls_internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finished_counts_per_code() {
        let metrics = CallMetrics::new();
        for _ in 0..3 {
            metrics.record_call_started("/m");
        }
        metrics.record_call_finished("/m", &Status::ok());
        metrics.record_call_finished("/m", &Status::deadline_exceeded("late"));

        assert_eq!(metrics.calls_finished_with(Code::Ok), 1);
        assert_eq!(metrics.calls_finished_with(Code::DeadlineExceeded), 1);
        assert_eq!(metrics.calls_finished_with(Code::Internal), 0);
        assert_eq!(metrics.calls_finished(), 2);
        assert_eq!(metrics.active_calls(), 1);
    }

    #[test]
    fn test_message_counters() {
        let metrics = CallMetrics::new();
        metrics.record_message_sent();
        metrics.record_message_sent();
        metrics.record_message_received();
        assert_eq!(metrics.messages_sent(), 2);
        assert_eq!(metrics.messages_received(), 1);
    }
}
