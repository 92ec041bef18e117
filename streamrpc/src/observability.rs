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

//! Logging and metrics.
//!
//! - [`init_tracing`] installs a `tracing-subscriber` formatter for binaries
//! - [`CallMetrics`] counts calls by outcome and messages by direction
//! - [`log_status`] and [`log_error`] emit structured events at a level that
//!   matches how alarming the outcome is
//!
//! Library code emits `tracing` events unconditionally. The `observability`
//! feature adds spans on hot paths and exports [`CallMetrics`] through the
//! `metrics` crate.

mod metrics;

pub use self::metrics::CallMetrics;

use crate::call::{Code, Status};
use crate::error::RpcError;
use tracing_subscriber::EnvFilter;

/// Filter used when neither the caller nor `RUST_LOG` provides one.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `filter`; `filter` falls back to
/// [`DEFAULT_LOG_FILTER`]. Calling this more than once is harmless: later
/// calls leave the first subscriber in place.
pub fn init_tracing(filter: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter.unwrap_or(DEFAULT_LOG_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

/// Logs the terminal status of a call.
///
/// Successful calls log at DEBUG, expected early endings (cancellation and
/// deadlines) at INFO, and failures at WARN.
pub fn log_status(method: &str, status: &Status) {
    match status.code() {
        Code::Ok => tracing::debug!(method, "Call completed"),
        Code::Cancelled | Code::DeadlineExceeded => tracing::info!(
            method,
            code = %status.code(),
            detail = status.detail().unwrap_or_default(),
            "Call ended early"
        ),
        Code::Unavailable | Code::Internal => tracing::warn!(
            method,
            code = %status.code(),
            detail = status.detail().unwrap_or_default(),
            "Call failed"
        ),
    }
}

/// Logs an [`RpcError`] with its classification.
pub fn log_error(error: &RpcError) {
    match error {
        RpcError::Transport(e) => tracing::error!(
            error = %e,
            recoverable = error.is_recoverable(),
            security_failure = e.is_security_failure(),
            "Transport error"
        ),
        RpcError::Call(e) => tracing::warn!(
            error = %e,
            protocol_violation = e.is_protocol_violation(),
            "Call error"
        ),
        RpcError::Config(e) => tracing::error!(error = %e, "Configuration error"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;

    #[test]
    fn test_logging_every_code() {
        init_tracing(Some("debug"));
        for status in [
            Status::ok(),
            Status::cancelled("stop"),
            Status::deadline_exceeded("late"),
            Status::unavailable("gone"),
            Status::internal("boom"),
        ] {
            log_status("/m", &status);
        }
    }

    #[test]
    fn test_log_error_variants() {
        log_error(&RpcError::Transport(TransportError::invalid_certificate("expired")));
        log_error(&RpcError::Call(crate::call::CallError::StreamClosed));
    }
}
