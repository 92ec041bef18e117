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

//! Per-call cancellation token and terminal status cell.
//!
//! Every call has exactly one [`CallContext`], shared by its session, its
//! dispatcher or invoker, and any background task watching its deadline. The
//! context holds the call's terminal [`Status`], which is written at most
//! once; every later attempt to finish the call observes the first value.
//!
//! Handlers use the context in one of two ways:
//!
//! ```rust
//! use streamrpc::call::{CallContext, Status};
//! use std::time::Duration;
//!
//! // Polling between units of work.
//! async fn slow_steps(ctx: &CallContext) -> Result<(), Status> {
//!     for _ in 0..3 {
//!         ctx.check()?;
//!         tokio::time::sleep(Duration::from_millis(10)).await;
//!     }
//!     Ok(())
//! }
//!
//! // Racing a long wait against cancellation.
//! async fn wait_or_cancel(ctx: &CallContext) -> Result<(), Status> {
//!     tokio::select! {
//!         status = ctx.cancelled() => Err(status),
//!         _ = tokio::time::sleep(Duration::from_secs(60)) => Ok(()),
//!     }
//! }
//! ```

use crate::call::{CallId, Metadata, Status};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Shared view of one call: identity, deadline, metadata and terminal status.
///
/// Cloning is cheap and every clone observes the same status.
#[derive(Clone)]
pub struct CallContext {
    inner: Arc<Inner>,
}

struct Inner {
    id: CallId,
    method: String,
    deadline: Option<Instant>,
    metadata: Metadata,
    status: watch::Sender<Option<Status>>,
}

impl CallContext {
    /// Creates a context for a call that has not finished yet.
    pub fn new(
        id: CallId,
        method: impl Into<String>,
        deadline: Option<Instant>,
        metadata: Metadata,
    ) -> Self {
        let (status, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                id,
                method: method.into(),
                deadline,
                metadata,
                status,
            }),
        }
    }

    /// The call id on its connection.
    pub fn id(&self) -> CallId {
        self.inner.id
    }

    /// Full method path.
    pub fn method(&self) -> &str {
        &self.inner.method
    }

    /// Absolute deadline, if one was set.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left until the deadline; zero once it has passed.
    pub fn time_remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Metadata sent by the caller.
    pub fn metadata(&self) -> &Metadata {
        &self.inner.metadata
    }

    /// The terminal status, once the call has finished.
    pub fn status(&self) -> Option<Status> {
        self.inner.status.borrow().clone()
    }

    /// `true` once the call has a terminal status.
    pub fn is_finished(&self) -> bool {
        self.inner.status.borrow().is_some()
    }

    /// `true` if the call was cancelled, failed, or ran past its deadline.
    ///
    /// This is the cheap check handlers should make between units of work.
    pub fn is_cancelled(&self) -> bool {
        match &*self.inner.status.borrow() {
            Some(status) => !status.is_ok(),
            None => self.deadline_passed(),
        }
    }

    /// Fails with the call's terminal status if it ended with anything other
    /// than `OK`.
    ///
    /// A deadline that passed without anyone noticing finishes the call with
    /// `DeadlineExceeded` first, so the error is the status the peer sees.
    pub fn check(&self) -> Result<(), Status> {
        let status = match self.status() {
            Some(status) => status,
            None if self.deadline_passed() => {
                self.finish(Status::deadline_exceeded("deadline exceeded"))
            }
            None => return Ok(()),
        };
        if status.is_ok() { Ok(()) } else { Err(status) }
    }

    /// Cancels the call. Returns the effective terminal status, which is the
    /// earlier one if the call had already finished.
    pub fn cancel(&self) -> Status {
        self.finish(Status::cancelled("call cancelled by caller"))
    }

    /// Sets the terminal status if none is set yet and returns whichever
    /// status is now in effect.
    pub(crate) fn finish(&self, status: Status) -> Status {
        self.inner.status.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(status.clone());
            true
        });
        self.inner.status.borrow().clone().unwrap_or(status)
    }

    /// Waits for the terminal status, finishing the call with
    /// `DeadlineExceeded` if the deadline passes first.
    pub async fn done(&self) -> Status {
        let mut rx = self.inner.status.subscribe();
        let finished = async move {
            rx.wait_for(Option::is_some)
                .await
                .ok()
                .and_then(|status| (*status).clone())
                .unwrap_or_else(|| Status::internal("call context dropped"))
        };

        match self.inner.deadline {
            Some(deadline) => tokio::select! {
                status = finished => status,
                _ = tokio::time::sleep_until(deadline) => {
                    self.finish(Status::deadline_exceeded("deadline exceeded"))
                }
            },
            None => finished.await,
        }
    }

    /// Waits until the call ends with anything other than `OK`.
    ///
    /// Never resolves for a call that completes successfully, which makes it
    /// suitable as a `select!` arm next to the real work.
    pub async fn cancelled(&self) -> Status {
        let status = self.done().await;
        if !status.is_ok() {
            return status;
        }
        std::future::pending().await
    }

    fn deadline_passed(&self) -> bool {
        self.inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("id", &self.inner.id)
            .field("method", &self.inner.method)
            .field("deadline", &self.inner.deadline)
            .field("status", &*self.inner.status.borrow())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::Code;

    fn context(deadline: Option<Instant>) -> CallContext {
        CallContext::new(CallId::from(1), "/greet.GreetService/Greet", deadline, Metadata::new())
    }

    #[test]
    fn test_status_is_set_once() {
        let ctx = context(None);
        assert!(!ctx.is_finished());

        let first = ctx.finish(Status::cancelled("first"));
        let second = ctx.finish(Status::internal("second"));

        assert_eq!(first.code(), Code::Cancelled);
        assert_eq!(second, first);
        assert_eq!(ctx.status(), Some(first));
    }

    #[test]
    fn test_ok_is_not_cancelled() {
        let ctx = context(None);
        ctx.finish(Status::ok());
        assert!(ctx.is_finished());
        assert!(!ctx.is_cancelled());
        assert_eq!(ctx.cancel().code(), Code::Ok);
    }

    #[test]
    fn test_clones_share_status() {
        let ctx = context(None);
        let other = ctx.clone();
        other.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_passed_deadline_reads_as_cancelled() {
        let ctx = context(Some(Instant::now() - Duration::from_millis(1)));
        assert!(ctx.is_cancelled());
        assert_eq!(ctx.time_remaining(), Some(Duration::ZERO));
        assert!(!ctx.is_finished());
    }

    #[test]
    fn test_check_reports_passed_deadline_as_deadline_exceeded() {
        let ctx = context(Some(Instant::now() - Duration::from_millis(1)));
        let status = ctx.check().unwrap_err();
        assert_eq!(status.code(), Code::DeadlineExceeded);
        assert_eq!(ctx.status(), Some(status));
    }

    #[test]
    fn test_check_reports_cancellation() {
        let ctx = context(None);
        assert!(ctx.check().is_ok());
        ctx.cancel();
        assert_eq!(ctx.check().unwrap_err().code(), Code::Cancelled);
    }

    #[test]
    fn test_check_passes_after_success() {
        let ctx = context(Some(Instant::now() - Duration::from_millis(1)));
        ctx.finish(Status::ok());
        assert!(ctx.check().is_ok());
    }

    #[tokio::test]
    async fn test_done_fires_on_deadline() {
        let ctx = context(Some(Instant::now() + Duration::from_millis(20)));
        let started = Instant::now();

        let status = ctx.done().await;

        assert_eq!(status.code(), Code::DeadlineExceeded);
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(ctx.status().map(|s| s.code()), Some(Code::DeadlineExceeded));
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiters() {
        let ctx = context(None);
        let waiter = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.cancelled().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        ctx.cancel();

        let status = waiter.await.unwrap();
        assert!(status.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_ignores_success() {
        let ctx = context(None);
        ctx.finish(Status::ok());
        let result = tokio::time::timeout(Duration::from_millis(20), ctx.cancelled()).await;
        assert!(result.is_err());
    }
}
