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

//! Per-call message credit.
//!
//! Every call direction starts with [`CALL_WINDOW`] messages of credit. The
//! sender spends one unit per message and suspends at zero. The receiver
//! queues at most a window's worth of messages and hands credit back with a
//! `WindowUpdate` frame once its application has consumed half the window.

use std::sync::Arc;
use tokio::sync::Semaphore;

/// Messages one side may have in flight on a call before it must wait for
/// the peer to consume some. Both peers use the same value.
pub const CALL_WINDOW: u32 = 64;

/// Depth of a call's inbound queue: a full window of messages plus the
/// half-close and status frames that can trail it.
pub(crate) const INBOUND_QUEUE_DEPTH: usize = CALL_WINDOW as usize + 2;

/// The window was closed because the call can no longer send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct WindowClosed;

/// Credit this side still holds for sending messages on one call.
///
/// Shared between the connection's reader, which adds credit as the peer
/// grants it, and the call's sender, which spends it.
#[derive(Debug, Clone)]
pub(crate) struct SendWindow {
    credit: Arc<Semaphore>,
    size: u32,
}

impl SendWindow {
    pub(crate) fn new(size: u32) -> Self {
        Self {
            credit: Arc::new(Semaphore::new(size as usize)),
            size,
        }
    }

    /// Waits until one message may be sent and spends its credit.
    pub(crate) async fn reserve(&self) -> Result<(), WindowClosed> {
        let permit = self.credit.acquire().await.map_err(|_| WindowClosed)?;
        permit.forget();
        Ok(())
    }

    /// Adds credit granted by the peer. Credit never exceeds the window size.
    pub(crate) fn grant(&self, credit: u32) {
        let room = (self.size as usize).saturating_sub(self.credit.available_permits());
        let credit = (credit as usize).min(room);
        if credit > 0 {
            self.credit.add_permits(credit);
        }
    }

    /// Wakes every waiting sender with [`WindowClosed`]. Later reservations
    /// fail immediately.
    pub(crate) fn close(&self) {
        self.credit.close();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.credit.is_closed()
    }

    pub(crate) fn available(&self) -> usize {
        self.credit.available_permits()
    }
}

/// Counts consumed messages and decides when to return credit to the peer.
#[derive(Debug)]
pub(crate) struct ReceiveWindow {
    threshold: u32,
    consumed: u32,
}

impl ReceiveWindow {
    pub(crate) fn new(size: u32) -> Self {
        Self {
            threshold: (size / 2).max(1),
            consumed: 0,
        }
    }

    /// Records one consumed message. Returns the credit to grant back once
    /// half the window has been consumed.
    pub(crate) fn consume(&mut self) -> Option<u32> {
        self.consumed += 1;
        if self.consumed < self.threshold {
            return None;
        }
        Some(std::mem::take(&mut self.consumed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_reserve_spends_credit() {
        let window = SendWindow::new(3);
        window.reserve().await.unwrap();
        window.reserve().await.unwrap();
        assert_eq!(window.available(), 1);
    }

    #[tokio::test]
    async fn test_wait_for_credit() {
        let window = SendWindow::new(1);
        window.reserve().await.unwrap();

        let waiter = {
            let window = window.clone();
            tokio::spawn(async move { window.reserve().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());

        window.grant(1);
        assert_eq!(waiter.await.unwrap(), Ok(()));
        assert_eq!(window.available(), 0);
    }

    #[tokio::test]
    async fn test_close_wakes_waiting_sender() {
        let window = SendWindow::new(1);
        window.reserve().await.unwrap();

        let waiter = {
            let window = window.clone();
            tokio::spawn(async move { window.reserve().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        window.close();

        assert_eq!(waiter.await.unwrap(), Err(WindowClosed));
        assert!(window.is_closed());
        assert_eq!(window.reserve().await, Err(WindowClosed));
    }

    #[test]
    fn test_grant_is_capped_at_window_size() {
        let window = SendWindow::new(4);
        window.grant(100);
        assert_eq!(window.available(), 4);
    }

    #[test]
    fn test_credit_returned_at_half_window() {
        let mut window = ReceiveWindow::new(8);
        assert_eq!(window.consume(), None);
        assert_eq!(window.consume(), None);
        assert_eq!(window.consume(), None);
        assert_eq!(window.consume(), Some(4));
        assert_eq!(window.consume(), None);
    }

    #[test]
    fn test_tiny_window_returns_every_message() {
        let mut window = ReceiveWindow::new(1);
        assert_eq!(window.consume(), Some(1));
        assert_eq!(window.consume(), Some(1));
    }
}
